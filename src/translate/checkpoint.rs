use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::command::ToolCommand;
use crate::config::CheckpointConfig;
use crate::error::{Result, YimtError};
use crate::tokenizer::SubwordTokenizer;
use super::{BackendKind, TranslationBackend, batch::{ModelOutput, PaddedBatch, TensorModel}};

/// The part of a training config the checkpoint restore depends on
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub model_dir: PathBuf,
}

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| YimtError::Config(format!("Failed to read training config {}: {}", path.display(), e)))?;

        let config: RunConfig = serde_yaml::from_str(&content)?;
        if !config.model_dir.is_dir() {
            return Err(YimtError::Config(format!(
                "model_dir {} from {} does not exist",
                config.model_dir.display(),
                path.display()
            )));
        }
        Ok(config)
    }
}

/// Restores the latest checkpoint of a training run through the training
/// framework's `infer` entry point
pub struct FrameworkCheckpointModel {
    config_file: PathBuf,
    run_config: RunConfig,
    binary_path: String,
    extra_args: Vec<String>,
}

impl FrameworkCheckpointModel {
    pub fn load<P: AsRef<Path>>(config_file: P, config: &CheckpointConfig) -> Result<Self> {
        let config_file = config_file.as_ref().to_path_buf();
        let run_config = RunConfig::from_file(&config_file)?;

        info!("Restoring checkpoint model from {}", run_config.model_dir.display());
        Ok(Self {
            config_file,
            run_config,
            binary_path: config.binary_path.clone(),
            extra_args: config.extra_args.clone(),
        })
    }

    pub fn model_dir(&self) -> &Path {
        &self.run_config.model_dir
    }

    fn infer_command(&self, features_file: &Path, predictions_file: &Path) -> ToolCommand {
        ToolCommand::new(&self.binary_path, "Checkpoint inference")
            .flag("config", self.config_file.to_string_lossy())
            .arg("--auto_config")
            .args(self.extra_args.iter().cloned())
            .arg("infer")
            .flag("features_file", features_file.to_string_lossy())
            .flag("predictions_file", predictions_file.to_string_lossy())
    }
}

#[async_trait]
impl TensorModel for FrameworkCheckpointModel {
    /// Runs one `infer` process per batch. The framework restores the latest
    /// checkpoint of `model_dir` on every run, so the weights are read once per
    /// batch rather than once per translator. The rows go out unpadded and
    /// predictions come back one line per row.
    async fn run(&self, inputs: &PaddedBatch) -> Result<ModelOutput> {
        if inputs.is_empty() {
            return Ok(ModelOutput::default());
        }

        debug!(
            "Running checkpoint inference on {} examples from {}",
            inputs.len(),
            self.model_dir().display()
        );
        let work_dir = tempfile::tempdir()?;
        let features_file = work_dir.path().join("features.txt");
        let predictions_file = work_dir.path().join("predictions.txt");

        let mut features = String::new();
        for row in inputs.rows() {
            features.push_str(&row.join(" "));
            features.push('\n');
        }
        tokio::fs::write(&features_file, features).await?;

        self.infer_command(&features_file, &predictions_file)
            .execute(YimtError::Backend)
            .await?;

        let predictions = tokio::fs::read_to_string(&predictions_file).await?;
        let rows = parse_predictions(&predictions);
        debug!("Checkpoint inference produced {} predictions", rows.len());
        Ok(ModelOutput::from_rows(rows))
    }
}

/// One space-separated token sequence per line
fn parse_predictions(content: &str) -> Vec<Vec<String>> {
    content
        .lines()
        .map(|line| line.split_whitespace().map(str::to_string).collect())
        .collect()
}

/// Checkpoint-based translator: in-process call on padded tensor features
pub struct CheckpointBackend {
    model: Box<dyn TensorModel>,
}

impl CheckpointBackend {
    pub fn new(model: Box<dyn TensorModel>) -> Self {
        Self { model }
    }

    /// Build from a training config file (YAML with `model_dir`)
    pub fn from_config_file<P: AsRef<Path>>(config_file: P, config: &CheckpointConfig) -> Result<Self> {
        let model = FrameworkCheckpointModel::load(config_file, config)?;
        Ok(Self::new(Box::new(model)))
    }
}

#[async_trait]
impl TranslationBackend for CheckpointBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Checkpoint
    }

    async fn translate_batch(&self, tokenizer: &dyn SubwordTokenizer, texts: &[String]) -> Result<Vec<String>> {
        let inputs = PaddedBatch::from_tokens(tokenizer.encode(texts));
        let outputs = self.model.run(&inputs).await?;
        outputs.into_texts(texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::batch::MockTensorModel;
    use assert_fs::prelude::*;

    struct CharTokenizer;

    impl SubwordTokenizer for CharTokenizer {
        fn encode(&self, texts: &[String]) -> Vec<Vec<String>> {
            texts
                .iter()
                .map(|t| t.split(' ').map(|w| format!("▁{}", w)).collect())
                .collect()
        }
    }

    #[test]
    fn test_run_config_requires_model_dir() {
        let dir = assert_fs::TempDir::new().unwrap();
        let config = dir.child("run.yml");
        config.write_str("data:\n  source_vocabulary: src.vocab\n").unwrap();

        assert!(matches!(RunConfig::from_file(config.path()), Err(YimtError::Yaml(_))));
    }

    #[test]
    fn test_run_config_checks_model_dir_exists() {
        let dir = assert_fs::TempDir::new().unwrap();
        let config = dir.child("run.yml");
        config.write_str("model_dir: /nonexistent/run\n").unwrap();
        assert!(matches!(RunConfig::from_file(config.path()), Err(YimtError::Config(_))));

        let model_dir = dir.child("run");
        model_dir.create_dir_all().unwrap();
        config
            .write_str(&format!("model_dir: {}\ntrain:\n  batch_size: 3072\n", model_dir.path().display()))
            .unwrap();
        let run = RunConfig::from_file(config.path()).unwrap();
        assert_eq!(run.model_dir, model_dir.path());
    }

    #[test]
    fn test_infer_command_line() {
        let model = FrameworkCheckpointModel {
            config_file: PathBuf::from("run.yml"),
            run_config: RunConfig { model_dir: PathBuf::from("run") },
            binary_path: "onmt-main".to_string(),
            extra_args: vec!["--mixed_precision".to_string()],
        };

        let cmd = model.infer_command(Path::new("in.txt"), Path::new("out.txt"));
        assert_eq!(cmd.binary_path, "onmt-main");
        assert_eq!(
            cmd.args,
            vec![
                "--config", "run.yml", "--auto_config", "--mixed_precision", "infer",
                "--features_file", "in.txt", "--predictions_file", "out.txt",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_batch_skips_inference() {
        let model = FrameworkCheckpointModel {
            config_file: PathBuf::from("run.yml"),
            run_config: RunConfig { model_dir: PathBuf::from("run") },
            binary_path: "/nonexistent/onmt-main".to_string(),
            extra_args: Vec::new(),
        };

        let output = model.run(&PaddedBatch::from_tokens(Vec::new())).await.unwrap();
        assert_eq!(output, ModelOutput::default());
        assert_eq!(model.model_dir(), Path::new("run"));
    }

    #[test]
    fn test_parse_predictions() {
        let rows = parse_predictions("▁你好 。\n\n▁谢谢\n");
        assert_eq!(rows, vec![vec!["▁你好", "。"], vec![], vec!["▁谢谢"]]);
    }

    #[tokio::test]
    async fn test_translate_batch_pads_and_strips() {
        let mut model = MockTensorModel::new();
        model
            .expect_run()
            .times(1)
            .withf(|inputs: &PaddedBatch| inputs.length == vec![1, 3] && inputs.max_length() == 3)
            .returning(|_| {
                Ok(ModelOutput {
                    tokens: vec![
                        vec!["▁A".to_string(), String::new()],
                        vec!["▁B".to_string(), "▁C".to_string()],
                    ],
                    length: vec![1, 2],
                })
            });

        let backend = CheckpointBackend::new(Box::new(model));
        let texts = vec!["a".to_string(), "b c d".to_string()];
        let out = backend.translate_batch(&CharTokenizer, &texts).await.unwrap();
        assert_eq!(out, vec!["A", "B C"]);
        assert_eq!(backend.kind(), BackendKind::Checkpoint);
    }
}
