use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, YimtError};
use crate::lang::LanguagePair;
use crate::train::ModelType;

pub const DEFAULT_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub translator: TranslatorConfig,
    pub checkpoint: CheckpointConfig,
    pub serving: ServingConfig,
    pub ct2: Ct2Config,
    pub sentencepiece: SentencePieceConfig,
    pub training: TrainingConfig,
    pub lexicon: LexiconConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// CTranslate2 model directory, SavedModel export directory, or checkpoint YAML config
    pub model_path: Option<PathBuf>,
    /// SentencePiece model for the source language
    pub sp_model_path: Option<PathBuf>,
    /// Language pair served by the translator
    pub lang_pair: LanguagePair,
    /// Maximum number of sentences per backend call
    pub batch_size: usize,
    /// Treat hard-wrapped lines as one paragraph; only blank lines separate paragraphs
    pub combine_lines: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Training framework entry point used for checkpoint inference
    pub binary_path: String,
    /// Extra arguments placed before the `infer` run type
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServingConfig {
    /// Model server REST endpoint
    pub endpoint: String,
    /// Served model name; defaults to the export directory name
    pub model_name: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ct2Config {
    /// Device to run the engine on ("cpu" or "cuda")
    pub device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentencePieceConfig {
    /// Path to spm_train binary
    pub train_binary: String,
    /// Path to spm_encode binary
    pub encode_binary: String,
    /// Path to the training framework's vocabulary builder
    pub build_vocab_binary: String,
    pub vocab_size: u32,
    /// Maximum number of corpus sentences sampled for training
    pub max_sentences: u64,
    /// Character coverage of the trained vocabulary
    pub coverage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub model_type: ModelType,
    pub mixed_precision: bool,
    /// Run evaluation on the eval set during training
    pub with_eval: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    /// JSON lexicon file (word -> list of translations)
    pub path: Option<PathBuf>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            sp_model_path: None,
            lang_pair: LanguagePair::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            combine_lines: false,
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            binary_path: "onmt-main".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8501".to_string(),
            model_name: None,
            timeout_secs: 300,
        }
    }
}

impl Default for Ct2Config {
    fn default() -> Self {
        Self {
            device: "cpu".to_string(),
        }
    }
}

impl Default for SentencePieceConfig {
    fn default() -> Self {
        Self {
            train_binary: "spm_train".to_string(),
            encode_binary: "spm_encode".to_string(),
            build_vocab_binary: "onmt-build-vocab".to_string(),
            vocab_size: 32000,
            max_sentences: 5_000_000,
            coverage: 0.9999,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::Transformer,
            mixed_precision: true,
            with_eval: false,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| YimtError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| YimtError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| YimtError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.translator.batch_size == 0 {
            return Err(YimtError::Config("translator.batch_size must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.sentencepiece.coverage) {
            return Err(YimtError::Config(format!(
                "sentencepiece.coverage must be within [0, 1], got {}",
                self.sentencepiece.coverage
            )));
        }
        Ok(())
    }
}
