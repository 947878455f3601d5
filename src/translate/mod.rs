// Translation serving
//
// A Translator owns one tokenizer, one language pair, one batch size and one
// backend, all fixed at construction. Backends are chosen by the factory:
// - Ct2: CTranslate2 model directory
// - SavedModel: exported model directory served over REST
// - Checkpoint: training config restoring the latest checkpoint

pub mod batch;
pub mod checkpoint;
pub mod ct2;
pub mod saved_model;

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub use batch::*;
use crate::config::Config;
use crate::error::{Result, YimtError};
use crate::lang::LanguagePair;
use crate::text::{ParagraphSegmenter, SegmenterFactory, Segmentation};
use crate::tokenizer::{SentencePieceModel, SubwordTokenizer};

/// Serializes model inference across the whole process
static TRANSLATION_LOCK: Mutex<()> = Mutex::const_new(());

/// Which inference backend a translator runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Ct2,
    SavedModel,
    Checkpoint,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ct2 => "ctranslate2",
            Self::SavedModel => "saved-model",
            Self::Checkpoint => "checkpoint",
        };
        f.write_str(name)
    }
}

/// Main trait for inference backends
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Translate one batch of sentences, returning one translation per sentence in order
    async fn translate_batch(&self, tokenizer: &dyn SubwordTokenizer, texts: &[String]) -> Result<Vec<String>>;
}

pub struct Translator {
    tokenizer: Arc<dyn SubwordTokenizer>,
    lang_pair: LanguagePair,
    batch_size: usize,
    backend: Box<dyn TranslationBackend>,
    segmenter: Box<dyn ParagraphSegmenter>,
}

impl Translator {
    pub fn new(
        tokenizer: Arc<dyn SubwordTokenizer>,
        lang_pair: LanguagePair,
        batch_size: usize,
        backend: Box<dyn TranslationBackend>,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(YimtError::Config("batch_size must be at least 1".to_string()));
        }

        Ok(Self {
            tokenizer,
            lang_pair,
            batch_size,
            backend,
            segmenter: SegmenterFactory::create_default(),
        })
    }

    /// Replace the paragraph segmenter
    pub fn with_segmenter(mut self, segmenter: Box<dyn ParagraphSegmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn lang_pair(&self) -> &LanguagePair {
        &self.lang_pair
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Translate text paragraphs, keeping the paragraph layout of the source
    pub async fn translate_paragraph(&self, text: &str) -> Result<String> {
        let Segmentation { sentences, breaks } = self.segmenter.segment(text, &self.lang_pair.from_lang);

        let translations = self.translate_list(&sentences).await?;

        self.segmenter.reassemble(translations, breaks, &self.lang_pair.to_lang)
    }

    /// Translate a list of sentences batch by batch, holding the process-wide
    /// inference lock for the whole call
    pub async fn translate_list(&self, texts: &[String]) -> Result<Vec<String>> {
        let _guard = TRANSLATION_LOCK.lock().await;

        info!(
            "Translating {} sentences ({}) with {} backend",
            texts.len(),
            self.lang_pair,
            self.backend.kind()
        );

        let mut results = Vec::with_capacity(texts.len());
        for (idx, to_translate) in texts.chunks(self.batch_size).enumerate() {
            debug!("Batch {}: {} sentences", idx + 1, to_translate.len());

            let translations = self.backend.translate_batch(self.tokenizer.as_ref(), to_translate).await?;
            if translations.len() != to_translate.len() {
                return Err(YimtError::Backend(format!(
                    "Backend returned {} translations for a batch of {}",
                    translations.len(),
                    to_translate.len()
                )));
            }

            results.extend(postprocess(&self.lang_pair.to_lang, translations));
        }

        Ok(results)
    }
}

/// Factory for creating translators from a model location
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Probe a model location; the first matching format wins
    pub fn detect_backend(location: &Path) -> BackendKind {
        if ct2::contains_model(location) {
            BackendKind::Ct2
        } else if saved_model::contains_saved_model(location) {
            BackendKind::SavedModel
        } else {
            BackendKind::Checkpoint
        }
    }

    /// Create the backend matching a model location
    pub fn create_backend(location: &Path, config: &Config) -> Result<Box<dyn TranslationBackend>> {
        let kind = Self::detect_backend(location);
        info!("Loading {} backend from {}", kind, location.display());

        let backend: Box<dyn TranslationBackend> = match kind {
            BackendKind::Ct2 => Box::new(ct2::Ct2Backend::load(location, &config.ct2)?),
            BackendKind::SavedModel => {
                Box::new(saved_model::SavedModelBackend::load(location, &config.serving)?)
            }
            BackendKind::Checkpoint => {
                Box::new(checkpoint::CheckpointBackend::from_config_file(location, &config.checkpoint)?)
            }
        };
        Ok(backend)
    }

    /// Create a translator from a model directory or training config file
    pub fn load_translator<P: AsRef<Path>, Q: AsRef<Path>>(
        model_or_config: P,
        sp_model_path: Q,
        lang_pair: Option<&str>,
        config: &Config,
    ) -> Result<Translator> {
        let lang_pair = match lang_pair {
            Some(pair) => pair.parse()?,
            None => config.translator.lang_pair.clone(),
        };

        let tokenizer = SentencePieceModel::load(sp_model_path)?;
        debug!("Source tokenizer: {}", tokenizer.model_path().display());
        let backend = Self::create_backend(model_or_config.as_ref(), config)?;

        let translator = Translator::new(Arc::new(tokenizer), lang_pair, config.translator.batch_size, backend)?;
        Ok(translator.with_segmenter(SegmenterFactory::create(config.translator.combine_lines)))
    }
}

/// Create a translator from a model directory or training config file
pub fn load_translator<P: AsRef<Path>, Q: AsRef<Path>>(
    model_or_config: P,
    sp_model_path: Q,
    lang_pair: Option<&str>,
    config: &Config,
) -> Result<Translator> {
    TranslatorFactory::load_translator(model_or_config, sp_model_path, lang_pair, config)
}
