use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, YimtError};

/// Abstract external tool invocation (training framework, SentencePiece tools)
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl ToolCommand {
    /// Create a new tool command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a path argument
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add a `--name value` flag pair
    pub fn flag<S: Into<String>>(self, name: &str, value: S) -> Self {
        self.arg(format!("--{}", name)).arg(value)
    }

    /// Add a `--name=value` option, the form the SentencePiece tools expect
    pub fn option<S: std::fmt::Display>(self, name: &str, value: S) -> Self {
        self.arg(format!("--{}={}", name, value))
    }

    /// Execute the command, failing with `on_error` if it exits unsuccessfully
    pub async fn execute(&self, on_error: fn(String) -> YimtError) -> Result<Output> {
        debug!("Executing tool command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| on_error(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(on_error(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = ToolCommand::new("spm_train", "Train")
            .option("vocab_size", 8000)
            .flag("config", "run.yml")
            .path(Path::new("/tmp/corpus.txt"));

        assert_eq!(cmd.args, vec!["--vocab_size=8000", "--config", "run.yml", "/tmp/corpus.txt"]);
    }

    #[tokio::test]
    async fn test_missing_binary_reports_error() {
        let cmd = ToolCommand::new("/nonexistent/yimt-tool", "Missing tool");
        let result = cmd.execute(YimtError::Vocab).await;
        assert!(matches!(result, Err(YimtError::Vocab(_))));
    }
}
