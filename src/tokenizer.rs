use std::path::{Path, PathBuf};

use rust_tokenizers::tokenizer::{SentencePieceTokenizer, Tokenizer};
use tracing::info;

use crate::error::{Result, YimtError};

/// Word-boundary marker used by SentencePiece pieces
pub const WORD_BOUNDARY: char = '\u{2581}';

/// Converts sentences into subword pieces
pub trait SubwordTokenizer: Send + Sync {
    /// Tokenize each sentence into subword pieces
    fn encode(&self, texts: &[String]) -> Vec<Vec<String>>;
}

/// SentencePiece model loaded once from a `.model` file
pub struct SentencePieceModel {
    tokenizer: SentencePieceTokenizer,
    model_path: PathBuf,
}

impl SentencePieceModel {
    /// Load a SentencePiece model, failing fast if the file is missing or invalid
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.is_file() {
            return Err(YimtError::FileNotFound(model_path.display().to_string()));
        }

        let path_str = model_path.to_string_lossy();
        let tokenizer = SentencePieceTokenizer::from_file(path_str.as_ref(), false)
            .map_err(|e| YimtError::Tokenizer(format!(
                "Failed to load SentencePiece model {}: {}",
                model_path.display(),
                e
            )))?;

        info!("Loaded SentencePiece model: {}", model_path.display());
        Ok(Self {
            tokenizer,
            model_path: model_path.to_path_buf(),
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl SubwordTokenizer for SentencePieceModel {
    fn encode(&self, texts: &[String]) -> Vec<Vec<String>> {
        texts.iter().map(|text| self.tokenizer.tokenize(text)).collect()
    }
}
