use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Result, YimtError};
use crate::tokenizer::WORD_BOUNDARY;

/// Sentinel used to pad token rows to the batch's maximum length
pub const PAD_TOKEN: &str = "";

/// Tokenized batch padded to a rectangle, plus each row's true length
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaddedBatch {
    pub tokens: Vec<Vec<String>>,
    pub length: Vec<usize>,
}

impl PaddedBatch {
    /// Pad every row with trailing sentinels up to the longest row
    pub fn from_tokens(mut all_tokens: Vec<Vec<String>>) -> Self {
        let length: Vec<usize> = all_tokens.iter().map(|tokens| tokens.len()).collect();
        let max_length = length.iter().copied().max().unwrap_or(0);

        for tokens in &mut all_tokens {
            tokens.resize(max_length, PAD_TOKEN.to_string());
        }

        Self {
            tokens: all_tokens,
            length,
        }
    }

    pub fn len(&self) -> usize {
        self.length.len()
    }

    pub fn is_empty(&self) -> bool {
        self.length.is_empty()
    }

    /// Width of every row
    pub fn max_length(&self) -> usize {
        self.tokens.first().map_or(0, |row| row.len())
    }

    /// Rows without their padding
    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.tokens
            .iter()
            .zip(&self.length)
            .map(|(tokens, &length)| &tokens[..length.min(tokens.len())])
    }
}

/// Model output: one (possibly padded) token row per input plus true lengths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOutput {
    pub tokens: Vec<Vec<String>>,
    pub length: Vec<usize>,
}

impl ModelOutput {
    /// Build an output from unpadded rows; every length is its row's width
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            length: rows.iter().map(Vec::len).collect(),
            tokens: rows,
        }
    }

    /// Truncate every row back to its true length
    pub fn strip_padding(self) -> Result<Vec<Vec<String>>> {
        if self.tokens.len() != self.length.len() {
            return Err(YimtError::Backend(format!(
                "Model returned {} token rows but {} lengths",
                self.tokens.len(),
                self.length.len()
            )));
        }

        self.tokens
            .into_iter()
            .zip(self.length)
            .map(|(mut tokens, length)| {
                if length > tokens.len() {
                    return Err(YimtError::Backend(format!(
                        "Output length {} exceeds row width {}",
                        length,
                        tokens.len()
                    )));
                }
                tokens.truncate(length);
                Ok(tokens)
            })
            .collect()
    }

    /// Strip padding and detokenize, checking one output per input sentence
    pub fn into_texts(self, expected: usize) -> Result<Vec<String>> {
        let rows = self.strip_padding()?;
        if rows.len() != expected {
            return Err(YimtError::Backend(format!(
                "Model returned {} outputs for {} inputs",
                rows.len(),
                expected
            )));
        }
        Ok(rows.iter().map(|tokens| detokenize(tokens)).collect())
    }
}

/// A model invoked on a padded tensor batch (checkpoint or exported signature)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TensorModel: Send + Sync {
    /// Run the model on a padded batch
    async fn run(&self, inputs: &PaddedBatch) -> Result<ModelOutput>;
}

/// Join subword pieces back into text, turning boundary markers into spaces
pub fn detokenize<S: AsRef<str>>(tokens: &[S]) -> String {
    let joined: Vec<&str> = tokens.iter().map(|t| t.as_ref()).collect();
    joined
        .join(" ")
        .replace(' ', "")
        .replace(WORD_BOUNDARY, " ")
        .trim()
        .to_string()
}

/// Replace ASCII comma/semicolon/colon with their full-width forms
pub fn normalize_zh_punctuation(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            ',' => '，',
            ';' => '；',
            ':' => '：',
            other => other,
        })
        .collect()
}

/// Locale postprocessing applied to every translated batch
pub fn postprocess(to_lang: &str, translations: Vec<String>) -> Vec<String> {
    if to_lang == "zh" {
        translations.iter().map(|t| normalize_zh_punctuation(t)).collect()
    } else {
        translations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(pieces: &[&str]) -> Vec<String> {
        pieces.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_padding_is_trailing_only() {
        let batch = PaddedBatch::from_tokens(vec![
            toks(&["▁a", "b", "c"]),
            toks(&["▁d", "e", "f", "g", "h"]),
            toks(&["▁i", "j"]),
        ]);

        assert_eq!(batch.length, vec![3, 5, 2]);
        assert_eq!(batch.max_length(), 5);
        assert_eq!(batch.tokens[0], toks(&["▁a", "b", "c", "", ""]));
        assert_eq!(batch.tokens[2], toks(&["▁i", "j", "", "", ""]));

        let rows: Vec<&[String]> = batch.rows().collect();
        assert_eq!(rows[1].len(), 5);
        assert_eq!(rows[2], &toks(&["▁i", "j"])[..]);
    }

    #[test]
    fn test_strip_padding_restores_lengths() {
        let output = ModelOutput {
            tokens: vec![
                toks(&["x", "y", "z", "", ""]),
                toks(&["1", "2", "3", "4", "5"]),
                toks(&["p", "q", "", "", ""]),
            ],
            length: vec![3, 5, 2],
        };

        let rows = output.strip_padding().unwrap();
        let lengths: Vec<usize> = rows.iter().map(|r| r.len()).collect();
        assert_eq!(lengths, vec![3, 5, 2]);
        assert!(rows.iter().flatten().all(|t| t != PAD_TOKEN));
    }

    #[test]
    fn test_strip_padding_rejects_overlong_length() {
        let output = ModelOutput {
            tokens: vec![toks(&["x"])],
            length: vec![2],
        };
        assert!(matches!(output.strip_padding(), Err(YimtError::Backend(_))));
    }

    #[test]
    fn test_into_texts_checks_count() {
        let output = ModelOutput::from_rows(vec![toks(&["▁hi"])]);
        assert!(output.clone().into_texts(2).is_err());
        assert_eq!(output.into_texts(1).unwrap(), vec!["hi"]);
    }

    #[test]
    fn test_rows_of_uneven_width() {
        let output = ModelOutput::from_rows(vec![toks(&["▁a", "b", "▁c"]), toks(&[]), toks(&["▁d"])]);
        assert_eq!(output.length, vec![3, 0, 1]);
        assert_eq!(output.into_texts(3).unwrap(), vec!["ab c", "", "d"]);
    }

    #[test]
    fn test_detokenize_uses_boundary_markers() {
        assert_eq!(detokenize(&["▁Hello", ",", "▁wor", "ld", "!"]), "Hello, world!");
        assert_eq!(detokenize(&["▁你好", "世界"]), "你好世界");
        assert_eq!(detokenize::<&str>(&[]), "");
    }

    #[test]
    fn test_zh_postprocessing() {
        let out = postprocess("zh", vec!["你怎么样,吗?".to_string(), "a;b:c".to_string()]);
        assert_eq!(out, vec!["你怎么样，吗?", "a；b：c"]);
    }

    #[test]
    fn test_zh_postprocessing_is_idempotent() {
        let once = normalize_zh_punctuation("一,二;三:四");
        assert_eq!(normalize_zh_punctuation(&once), once);
    }

    #[test]
    fn test_other_targets_pass_through() {
        let out = postprocess("ja", vec!["a, b; c: d".to_string()]);
        assert_eq!(out, vec!["a, b; c: d"]);
    }
}
