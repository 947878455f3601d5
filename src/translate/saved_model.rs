use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ServingConfig;
use crate::error::{Result, YimtError};
use crate::tokenizer::SubwordTokenizer;
use super::{BackendKind, TranslationBackend, batch::{ModelOutput, PaddedBatch, TensorModel}};

/// Marker file of an exported model directory
pub const SAVED_MODEL_FILE: &str = "saved_model.pb";

/// Signature invoked on the exported model
pub const SERVING_SIGNATURE: &str = "serving_default";

/// Whether the directory holds an exported model
pub fn contains_saved_model(dir: &Path) -> bool {
    dir.join(SAVED_MODEL_FILE).is_file()
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    signature_name: &'a str,
    inputs: &'a PaddedBatch,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    outputs: PredictOutputs,
}

/// Decoder outputs, shaped `tokens [batch][beam][time]` and `length [batch][beam]`
#[derive(Debug, Deserialize)]
struct PredictOutputs {
    tokens: Vec<Vec<Vec<String>>>,
    length: Vec<Vec<usize>>,
}

impl PredictOutputs {
    /// Keep the best beam of every example
    fn into_model_output(self) -> Result<ModelOutput> {
        let tokens = self
            .tokens
            .into_iter()
            .map(|beams| beams.into_iter().next())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| YimtError::Backend("Serving response has an example without beams".to_string()))?;
        let length = self
            .length
            .into_iter()
            .map(|beams| beams.first().copied())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| YimtError::Backend("Serving response has an example without lengths".to_string()))?;

        Ok(ModelOutput { tokens, length })
    }
}

/// Named serving signature of an exported model, reached over the model
/// server's REST predict API
pub struct ServingSignature {
    client: Client,
    url: String,
    name: &'static str,
}

impl ServingSignature {
    pub fn load<P: AsRef<Path>>(export_dir: P, config: &ServingConfig) -> Result<Self> {
        let export_dir = export_dir.as_ref();
        let model_name = match &config.model_name {
            Some(name) => name.clone(),
            None => export_dir
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .ok_or_else(|| YimtError::Config(format!(
                    "Cannot derive a served model name from {}",
                    export_dir.display()
                )))?,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let url = format!(
            "{}/v1/models/{}:predict",
            config.endpoint.trim_end_matches('/'),
            model_name
        );
        info!("Using exported model {} via {}", export_dir.display(), url);

        Ok(Self {
            client,
            url,
            name: SERVING_SIGNATURE,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TensorModel for ServingSignature {
    async fn run(&self, inputs: &PaddedBatch) -> Result<ModelOutput> {
        let request = PredictRequest {
            signature_name: self.name,
            inputs,
        };

        debug!("Sending predict request for {} examples to: {}", inputs.len(), self.url);

        let response = self.client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| YimtError::Backend(format!("Predict request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(YimtError::Backend(format!(
                "Model server error {}: {}", status, error_text
            )));
        }

        let predict_response: PredictResponse = response.json().await
            .map_err(|e| YimtError::Backend(format!("Failed to parse predict response: {}", e)))?;

        predict_response.outputs.into_model_output()
    }
}

/// Exported-model translator: padded tensors through the `serving_default` signature
pub struct SavedModelBackend {
    export_dir: PathBuf,
    signature: Box<dyn TensorModel>,
}

impl SavedModelBackend {
    pub fn new<P: AsRef<Path>>(export_dir: P, signature: Box<dyn TensorModel>) -> Self {
        Self {
            export_dir: export_dir.as_ref().to_path_buf(),
            signature,
        }
    }

    pub fn load<P: AsRef<Path>>(export_dir: P, config: &ServingConfig) -> Result<Self> {
        let signature = ServingSignature::load(&export_dir, config)?;
        Ok(Self::new(export_dir, Box::new(signature)))
    }
}

#[async_trait]
impl TranslationBackend for SavedModelBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SavedModel
    }

    async fn translate_batch(&self, tokenizer: &dyn SubwordTokenizer, texts: &[String]) -> Result<Vec<String>> {
        let inputs = PaddedBatch::from_tokens(tokenizer.encode(texts));
        debug!("Exported model {}: batch of {} padded to {}", self.export_dir.display(), inputs.len(), inputs.max_length());
        let outputs = self.signature.run(&inputs).await?;
        outputs.into_texts(texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_predict_request_shape() {
        let inputs = PaddedBatch::from_tokens(vec![
            vec!["▁a".to_string(), "b".to_string()],
            vec!["▁c".to_string()],
        ]);
        let request = PredictRequest {
            signature_name: SERVING_SIGNATURE,
            inputs: &inputs,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "signature_name": "serving_default",
                "inputs": {
                    "tokens": [["▁a", "b"], ["▁c", ""]],
                    "length": [2, 1]
                }
            })
        );
    }

    #[test]
    fn test_best_beam_is_selected_and_stripped() {
        let response: PredictResponse = serde_json::from_value(json!({
            "outputs": {
                "tokens": [
                    [["▁你好", "。", ""], ["▁嗨", "", ""]],
                    [["▁谢谢", "你", "。"], ["▁谢", "", ""]]
                ],
                "length": [[2, 1], [3, 1]]
            }
        }))
        .unwrap();

        let texts = response.outputs.into_model_output().unwrap().into_texts(2).unwrap();
        assert_eq!(texts, vec!["你好。", "谢谢你。"]);
    }

    #[test]
    fn test_missing_beam_is_an_error() {
        let outputs = PredictOutputs {
            tokens: vec![vec![]],
            length: vec![vec![0]],
        };
        assert!(matches!(outputs.into_model_output(), Err(YimtError::Backend(_))));
    }

    #[test]
    fn test_model_name_defaults_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let export_dir = dir.path().join("enzh");
        std::fs::create_dir_all(&export_dir).unwrap();

        let signature = ServingSignature::load(&export_dir, &ServingConfig::default()).unwrap();
        assert_eq!(signature.url(), "http://localhost:8501/v1/models/enzh:predict");

        let config = ServingConfig {
            endpoint: "http://models:8501/".to_string(),
            model_name: Some("translate".to_string()),
            ..ServingConfig::default()
        };
        let signature = ServingSignature::load(&export_dir, &config).unwrap();
        assert_eq!(signature.url(), "http://models:8501/v1/models/translate:predict");
    }

    #[test]
    fn test_contains_saved_model() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!contains_saved_model(dir.path()));
        std::fs::write(dir.path().join(SAVED_MODEL_FILE), b"").unwrap();
        assert!(contains_saved_model(dir.path()));
    }
}
