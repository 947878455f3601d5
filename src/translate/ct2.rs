use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::config::Ct2Config;
use crate::error::{Result, YimtError};
use crate::tokenizer::SubwordTokenizer;
use super::{BackendKind, TranslationBackend, batch::detokenize};

/// File that marks a CTranslate2 model directory
pub const CT2_MODEL_FILE: &str = "model.bin";

/// Whether the location is a directory holding a CTranslate2 model
pub fn contains_model(dir: &Path) -> bool {
    dir.is_dir() && dir.join(CT2_MODEL_FILE).is_file()
}

/// How the engine counts `max_batch_size`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchType {
    Examples,
    Tokens,
}

/// Decoding options passed to the engine's batch-translate primitive
#[derive(Debug, Clone, PartialEq)]
pub struct Ct2Options {
    pub beam_size: usize,
    pub batch_type: BatchType,
    pub max_batch_size: usize,
    pub replace_unknowns: bool,
    pub repetition_penalty: f32,
    pub target_prefix: Option<Vec<Vec<String>>>,
}

impl Default for Ct2Options {
    fn default() -> Self {
        Self {
            beam_size: 5,
            batch_type: BatchType::Tokens,
            max_batch_size: 1024,
            replace_unknowns: true,
            repetition_penalty: 1.2,
            target_prefix: None,
        }
    }
}

/// Optimized inference engine translating token sequences in batches
pub trait BatchTranslateEngine: Send + Sync {
    /// Translate tokenized sources, returning the hypotheses of each, best first
    fn translate_batch(&self, source: &[Vec<String>], options: &Ct2Options) -> Result<Vec<Vec<Vec<String>>>>;
}

/// Keep the best hypothesis of every input
fn best_hypotheses(results: Vec<Vec<Vec<String>>>) -> Result<Vec<Vec<String>>> {
    results
        .into_iter()
        .enumerate()
        .map(|(idx, hypotheses)| {
            hypotheses.into_iter().next().ok_or_else(|| {
                YimtError::Backend(format!("CTranslate2 returned no hypothesis for input {}", idx))
            })
        })
        .collect()
}

/// CTranslate2-based translator
pub struct Ct2Backend {
    engine: Arc<dyn BatchTranslateEngine>,
    options: Ct2Options,
}

impl Ct2Backend {
    pub fn new(engine: Arc<dyn BatchTranslateEngine>) -> Self {
        Self {
            engine,
            options: Ct2Options::default(),
        }
    }

    /// Load the native engine from a model directory
    pub fn load<P: AsRef<Path>>(model_dir: P, config: &Ct2Config) -> Result<Self> {
        let engine = native::load_engine(model_dir.as_ref(), config)?;
        Ok(Self::new(engine))
    }
}

#[async_trait]
impl TranslationBackend for Ct2Backend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ct2
    }

    async fn translate_batch(&self, tokenizer: &dyn SubwordTokenizer, texts: &[String]) -> Result<Vec<String>> {
        let source = tokenizer.encode(texts);
        let engine = Arc::clone(&self.engine);
        let options = self.options.clone();

        debug!("Submitting {} sentences to CTranslate2", source.len());
        let results = tokio::task::spawn_blocking(move || engine.translate_batch(&source, &options))
            .await
            .map_err(|e| YimtError::Backend(format!("CTranslate2 worker failed: {}", e)))??;
        let hypotheses = best_hypotheses(results)?;

        if hypotheses.len() != texts.len() {
            return Err(YimtError::Backend(format!(
                "CTranslate2 returned {} translations for {} inputs",
                hypotheses.len(),
                texts.len()
            )));
        }

        Ok(hypotheses.iter().map(|tokens| detokenize(tokens)).collect())
    }
}

#[cfg(feature = "ct2")]
mod native {
    use std::path::Path;
    use std::sync::Arc;

    use ct2rs::sys::Translator;
    use ct2rs::{Config, Device, TranslationOptions};
    use tracing::info;

    use crate::config::Ct2Config;
    use crate::error::{Result, YimtError};
    use super::{BatchTranslateEngine, BatchType, Ct2Options};

    struct NativeEngine {
        translator: Translator,
    }

    impl BatchTranslateEngine for NativeEngine {
        fn translate_batch(&self, source: &[Vec<String>], options: &Ct2Options) -> Result<Vec<Vec<Vec<String>>>> {
            let translate_options = TranslationOptions::<String, String> {
                beam_size: options.beam_size,
                batch_type: match options.batch_type {
                    BatchType::Examples => ct2rs::BatchType::Examples,
                    BatchType::Tokens => ct2rs::BatchType::Tokens,
                },
                max_batch_size: options.max_batch_size,
                replace_unknowns: options.replace_unknowns,
                repetition_penalty: options.repetition_penalty,
                ..Default::default()
            };

            let results = match &options.target_prefix {
                Some(prefix) => self.translator.translate_batch_with_target_prefix(source, prefix, &translate_options, None),
                None => self.translator.translate_batch(source, &translate_options, None),
            }
            .map_err(|e| YimtError::Backend(format!("CTranslate2 translation failed: {}", e)))?;

            Ok(results.into_iter().map(|result| result.hypotheses).collect())
        }
    }

    pub fn load_engine(model_dir: &Path, config: &Ct2Config) -> Result<Arc<dyn BatchTranslateEngine>> {
        let engine_config = Config {
            device: if config.device == "cuda" { Device::CUDA } else { Device::CPU },
            ..Default::default()
        };
        let translator = Translator::new(model_dir, &engine_config)
            .map_err(|e| YimtError::Backend(format!("Failed to load CTranslate2 model {}: {}", model_dir.display(), e)))?;

        info!("Loaded CTranslate2 model {} on {}", model_dir.display(), config.device);
        Ok(Arc::new(NativeEngine { translator }))
    }
}

#[cfg(not(feature = "ct2"))]
mod native {
    use std::path::Path;
    use std::sync::Arc;

    use crate::config::Ct2Config;
    use crate::error::{Result, YimtError};
    use super::BatchTranslateEngine;

    pub fn load_engine(model_dir: &Path, _config: &Ct2Config) -> Result<Arc<dyn BatchTranslateEngine>> {
        Err(YimtError::Backend(format!(
            "{} is a CTranslate2 model but CTranslate2 support is not compiled in (enable the `ct2` feature)",
            model_dir.display()
        )))
    }
}
