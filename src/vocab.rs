use std::path::{Path, PathBuf};
use tracing::info;

use crate::command::ToolCommand;
use crate::config::SentencePieceConfig;
use crate::error::{Result, YimtError};

/// Parameters of a SentencePiece training run
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub vocab_size: u32,
    pub max_sentences: u64,
    pub coverage: f64,
}

impl From<&SentencePieceConfig> for TrainOptions {
    fn from(config: &SentencePieceConfig) -> Self {
        Self {
            vocab_size: config.vocab_size,
            max_sentences: config.max_sentences,
            coverage: config.coverage,
        }
    }
}

/// Raw training and evaluation corpora of one language side
#[derive(Debug, Clone)]
pub struct PretrainCorpus {
    pub train: PathBuf,
    pub eval: PathBuf,
    pub vocab_size: u32,
}

/// Files produced by preparing one language side for training
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PretrainOutput {
    pub sp_model: PathBuf,
    pub train_tokens: PathBuf,
    pub eval_tokens: PathBuf,
    pub vocab: PathBuf,
}

/// Vocabulary tooling backed by the spm_train/spm_encode binaries and the
/// training framework's vocabulary builder
pub struct VocabBuilder {
    train_binary: String,
    encode_binary: String,
    build_vocab_binary: String,
}

impl VocabBuilder {
    pub fn new(config: &SentencePieceConfig) -> Self {
        Self {
            train_binary: config.train_binary.clone(),
            encode_binary: config.encode_binary.clone(),
            build_vocab_binary: config.build_vocab_binary.clone(),
        }
    }

    /// Default model prefix: `<corpus>-sp-<vocab_size>`
    pub fn default_prefix(corpus: &Path, vocab_size: u32) -> PathBuf {
        PathBuf::from(format!("{}-sp-{}", corpus.display(), vocab_size))
    }

    /// Default vocabulary file: `<tokenized corpus>.vocab`
    pub fn default_vocab_path(tokenized_corpus: &Path) -> PathBuf {
        PathBuf::from(format!("{}.vocab", tokenized_corpus.display()))
    }

    fn train_command(&self, corpus: &Path, prefix: &Path, options: &TrainOptions) -> ToolCommand {
        ToolCommand::new(&self.train_binary, "SentencePiece training")
            .option("input", corpus.display())
            .option("model_prefix", prefix.display())
            .option("vocab_size", options.vocab_size)
            .option("character_coverage", options.coverage)
            .option("input_sentence_size", options.max_sentences)
            .option("shuffle_input_sentence", true)
    }

    fn encode_command(&self, model: &Path, input: &Path, output: &Path) -> ToolCommand {
        ToolCommand::new(&self.encode_binary, "SentencePiece encoding")
            .option("model", model.display())
            .option("output_format", "piece")
            .option("output", output.display())
            .path(input)
    }

    fn build_vocab_command(&self, tokenized_corpus: &Path, vocab_path: &Path, size: u32) -> ToolCommand {
        ToolCommand::new(&self.build_vocab_binary, "Vocabulary building")
            .flag("size", size.to_string())
            .flag("save_vocab", vocab_path.to_string_lossy())
            .path(tokenized_corpus)
    }

    /// Train a SentencePiece model from a corpus, returning the `.model` path
    pub async fn train(&self, corpus: &Path, prefix: Option<&Path>, options: &TrainOptions) -> Result<PathBuf> {
        if !corpus.is_file() {
            return Err(YimtError::FileNotFound(corpus.display().to_string()));
        }

        let prefix = prefix
            .map(Path::to_path_buf)
            .unwrap_or_else(|| Self::default_prefix(corpus, options.vocab_size));

        info!(
            "Training SentencePiece model {} (vocab {}) from {}",
            prefix.display(),
            options.vocab_size,
            corpus.display()
        );
        self.train_command(corpus, &prefix, options)
            .execute(YimtError::Vocab)
            .await?;

        let model_path = PathBuf::from(format!("{}.model", prefix.display()));
        info!("SentencePiece model written to {}", model_path.display());
        Ok(model_path)
    }

    /// Tokenize a corpus file into space-separated pieces
    pub async fn encode_file(&self, model: &Path, input: &Path, output: &Path) -> Result<()> {
        for path in [model, input] {
            if !path.is_file() {
                return Err(YimtError::FileNotFound(path.display().to_string()));
            }
        }

        info!("Tokenizing {} -> {}", input.display(), output.display());
        self.encode_command(model, input, output)
            .execute(YimtError::Vocab)
            .await?;
        Ok(())
    }

    /// Build the model vocabulary of a tokenized corpus, returning the vocabulary path
    pub async fn build_vocab(&self, tokenized_corpus: &Path, vocab_path: Option<&Path>, size: u32) -> Result<PathBuf> {
        if !tokenized_corpus.is_file() {
            return Err(YimtError::FileNotFound(tokenized_corpus.display().to_string()));
        }

        let vocab_path = vocab_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| Self::default_vocab_path(tokenized_corpus));

        info!("Building vocabulary of size {} from {}", size, tokenized_corpus.display());
        self.build_vocab_command(tokenized_corpus, &vocab_path, size)
            .execute(YimtError::Vocab)
            .await?;

        info!("Vocabulary written to {}", vocab_path.display());
        Ok(vocab_path)
    }

    /// Prepare one language side for training: SentencePiece model, tokenized
    /// train/eval corpora and vocabulary, all written under `output_dir`
    pub async fn pretrain(&self, corpus: &PretrainCorpus, output_dir: &Path, options: &TrainOptions) -> Result<PretrainOutput> {
        for path in [&corpus.train, &corpus.eval] {
            if !path.is_file() {
                return Err(YimtError::FileNotFound(path.display().to_string()));
            }
        }
        tokio::fs::create_dir_all(output_dir).await?;

        let options = TrainOptions {
            vocab_size: corpus.vocab_size,
            ..options.clone()
        };
        let outputs = Self::pretrain_outputs(corpus, output_dir);
        let prefix = outputs.sp_model.with_extension("");

        self.train(&corpus.train, Some(&prefix), &options).await?;
        self.encode_file(&outputs.sp_model, &corpus.train, &outputs.train_tokens).await?;
        self.encode_file(&outputs.sp_model, &corpus.eval, &outputs.eval_tokens).await?;
        self.build_vocab(&outputs.train_tokens, Some(&outputs.vocab), corpus.vocab_size).await?;

        Ok(outputs)
    }

    fn pretrain_outputs(corpus: &PretrainCorpus, output_dir: &Path) -> PretrainOutput {
        let train_tokens = output_dir.join(format!("{}.tok", file_name(&corpus.train)));
        PretrainOutput {
            sp_model: output_dir.join(format!("{}-sp-{}.model", file_name(&corpus.train), corpus.vocab_size)),
            eval_tokens: output_dir.join(format!("{}.tok", file_name(&corpus.eval))),
            vocab: Self::default_vocab_path(&train_tokens),
            train_tokens,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "corpus".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> VocabBuilder {
        VocabBuilder::new(&SentencePieceConfig::default())
    }

    #[test]
    fn test_default_prefix() {
        assert_eq!(
            VocabBuilder::default_prefix(Path::new("data/train.en"), 32000),
            PathBuf::from("data/train.en-sp-32000")
        );
    }

    #[test]
    fn test_train_command_line() {
        let options = TrainOptions::from(&SentencePieceConfig::default());
        let cmd = builder().train_command(Path::new("c.txt"), Path::new("c.txt-sp-32000"), &options);

        assert_eq!(cmd.binary_path, "spm_train");
        assert_eq!(
            cmd.args,
            vec![
                "--input=c.txt",
                "--model_prefix=c.txt-sp-32000",
                "--vocab_size=32000",
                "--character_coverage=0.9999",
                "--input_sentence_size=5000000",
                "--shuffle_input_sentence=true",
            ]
        );
    }

    #[test]
    fn test_encode_command_line() {
        let cmd = builder().encode_command(Path::new("sp.model"), Path::new("in.txt"), Path::new("out.txt"));
        assert_eq!(cmd.binary_path, "spm_encode");
        assert_eq!(
            cmd.args,
            vec!["--model=sp.model", "--output_format=piece", "--output=out.txt", "in.txt"]
        );
    }

    #[test]
    fn test_build_vocab_command_line() {
        let cmd = builder().build_vocab_command(Path::new("train.en.tok"), Path::new("train.en.tok.vocab"), 4800);
        assert_eq!(cmd.binary_path, "onmt-build-vocab");
        assert_eq!(
            cmd.args,
            vec!["--size", "4800", "--save_vocab", "train.en.tok.vocab", "train.en.tok"]
        );
        assert_eq!(
            VocabBuilder::default_vocab_path(Path::new("train.en.tok")),
            PathBuf::from("train.en.tok.vocab")
        );
    }

    #[test]
    fn test_pretrain_output_layout() {
        let corpus = PretrainCorpus {
            train: PathBuf::from("data/train.en"),
            eval: PathBuf::from("data/dev.en"),
            vocab_size: 4800,
        };
        let outputs = VocabBuilder::pretrain_outputs(&corpus, Path::new("out"));

        assert_eq!(
            outputs,
            PretrainOutput {
                sp_model: PathBuf::from("out/train.en-sp-4800.model"),
                train_tokens: PathBuf::from("out/train.en.tok"),
                eval_tokens: PathBuf::from("out/dev.en.tok"),
                vocab: PathBuf::from("out/train.en.tok.vocab"),
            }
        );
        assert_eq!(outputs.sp_model.with_extension(""), PathBuf::from("out/train.en-sp-4800"));
    }

    #[test]
    fn test_missing_corpus_is_reported() {
        let options = TrainOptions::from(&SentencePieceConfig::default());
        let builder = builder();

        let result = tokio_test::block_on(builder.train(Path::new("/nonexistent/corpus.txt"), None, &options));
        assert!(matches!(result, Err(YimtError::FileNotFound(_))));

        let result = tokio_test::block_on(builder.build_vocab(Path::new("/nonexistent/corpus.tok"), None, 4800));
        assert!(matches!(result, Err(YimtError::FileNotFound(_))));

        let corpus = PretrainCorpus {
            train: PathBuf::from("/nonexistent/train.en"),
            eval: PathBuf::from("/nonexistent/dev.en"),
            vocab_size: 4800,
        };
        let result = tokio_test::block_on(builder.pretrain(&corpus, Path::new("/nonexistent/out"), &options));
        assert!(matches!(result, Err(YimtError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_failing_tool_is_a_vocab_error() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        std::fs::write(&corpus, "hello world\n").unwrap();

        let config = SentencePieceConfig {
            train_binary: "/nonexistent/spm_train".to_string(),
            ..SentencePieceConfig::default()
        };
        let options = TrainOptions::from(&config);
        let result = VocabBuilder::new(&config).train(&corpus, None, &options).await;
        assert!(matches!(result, Err(YimtError::Vocab(_))));
    }
}
