use thiserror::Error;

#[derive(Error, Debug)]
pub enum YimtError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Segmentation error: {0}")]
    Segmentation(String),

    #[error("Vocabulary tool error: {0}")]
    Vocab(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Word not found in lexicon: {0}")]
    WordNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, YimtError>;
