use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::command::ToolCommand;
use crate::config::{CheckpointConfig, TrainingConfig};
use crate::error::{Result, YimtError};

/// Model architecture passed to the training framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    Transformer,
    TransformerBig,
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transformer => "Transformer",
            Self::TransformerBig => "TransformerBig",
        };
        f.write_str(name)
    }
}

impl FromStr for ModelType {
    type Err = YimtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "transformer" => Ok(Self::Transformer),
            "transformerbig" => Ok(Self::TransformerBig),
            _ => Err(YimtError::Config(format!(
                "Unknown model type '{}', expected Transformer or TransformerBig",
                s
            ))),
        }
    }
}

/// Runs the training framework's `train` entry point on a run config
pub struct Trainer {
    binary_path: String,
    model_type: ModelType,
    mixed_precision: bool,
    with_eval: bool,
}

impl Trainer {
    pub fn new(checkpoint: &CheckpointConfig, training: &TrainingConfig) -> Self {
        Self {
            binary_path: checkpoint.binary_path.clone(),
            model_type: training.model_type,
            mixed_precision: training.mixed_precision,
            with_eval: training.with_eval,
        }
    }

    fn train_command(&self, config_file: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.binary_path, "Model training")
            .flag("model_type", self.model_type.to_string())
            .flag("config", config_file.to_string_lossy())
            .arg("--auto_config");
        if self.mixed_precision {
            cmd = cmd.arg("--mixed_precision");
        }
        cmd = cmd.arg("train");
        if self.with_eval {
            cmd = cmd.arg("--with_eval");
        }
        cmd
    }

    /// Train until the framework's configured stopping point
    pub async fn train(&self, config_file: &Path) -> Result<()> {
        if !config_file.is_file() {
            return Err(YimtError::FileNotFound(config_file.display().to_string()));
        }

        info!(
            "Training {} model from {} (mixed precision: {}, eval: {})",
            self.model_type,
            config_file.display(),
            self.mixed_precision,
            self.with_eval
        );
        self.train_command(config_file)
            .execute(YimtError::Training)
            .await?;

        info!("Training finished: {}", config_file.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trainer(model_type: ModelType, mixed_precision: bool, with_eval: bool) -> Trainer {
        Trainer::new(
            &CheckpointConfig::default(),
            &TrainingConfig { model_type, mixed_precision, with_eval },
        )
    }

    #[test]
    fn test_parse_model_type() {
        assert_eq!("Transformer".parse::<ModelType>().unwrap(), ModelType::Transformer);
        assert_eq!("transformer-big".parse::<ModelType>().unwrap(), ModelType::TransformerBig);
        assert_eq!("TransformerBig".parse::<ModelType>().unwrap(), ModelType::TransformerBig);
        assert!("rnn".parse::<ModelType>().is_err());
    }

    #[test]
    fn test_train_command_line() {
        let cmd = trainer(ModelType::Transformer, true, false).train_command(Path::new("run.yml"));
        assert_eq!(cmd.binary_path, "onmt-main");
        assert_eq!(
            cmd.args,
            vec!["--model_type", "Transformer", "--config", "run.yml", "--auto_config", "--mixed_precision", "train"]
        );
    }

    #[test]
    fn test_train_command_with_eval_in_full_precision() {
        let cmd = trainer(ModelType::TransformerBig, false, true).train_command(Path::new("big.yml"));
        assert_eq!(
            cmd.args,
            vec!["--model_type", "TransformerBig", "--config", "big.yml", "--auto_config", "train", "--with_eval"]
        );
    }

    #[test]
    fn test_missing_run_config() {
        let result = tokio_test::block_on(
            trainer(ModelType::Transformer, true, false).train(Path::new("/nonexistent/run.yml")),
        );
        assert!(matches!(result, Err(YimtError::FileNotFound(_))));
    }
}
