use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, YimtError};

pub const DEFAULT_SOURCE_LANG: &str = "en";
pub const DEFAULT_TARGET_LANG: &str = "zh";

/// Source/target language codes of a translator, written as `"<src>-<tgt>"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguagePair {
    pub from_lang: String,
    pub to_lang: String,
}

impl LanguagePair {
    pub fn new<S1: Into<String>, S2: Into<String>>(from_lang: S1, to_lang: S2) -> Self {
        Self {
            from_lang: from_lang.into(),
            to_lang: to_lang.into(),
        }
    }
}

/// Languages whose sentences are concatenated without a separating space
pub fn is_unspaced_language(code: &str) -> bool {
    matches!(code, "zh" | "ja")
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_LANG, DEFAULT_TARGET_LANG)
    }
}

impl FromStr for LanguagePair {
    type Err = YimtError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(from), Some(to), None) if !from.is_empty() && !to.is_empty() => {
                Ok(Self::new(from.to_lowercase(), to.to_lowercase()))
            }
            _ => Err(YimtError::Config(format!(
                "Invalid language pair '{}', expected <src>-<tgt> such as en-zh",
                s
            ))),
        }
    }
}

impl TryFrom<String> for LanguagePair {
    type Error = YimtError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LanguagePair> for String {
    fn from(pair: LanguagePair) -> Self {
        pair.to_string()
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from_lang, self.to_lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_pair() {
        let pair: LanguagePair = "en-zh".parse().unwrap();
        assert_eq!(pair.from_lang, "en");
        assert_eq!(pair.to_lang, "zh");

        let pair: LanguagePair = "DE-EN".parse().unwrap();
        assert_eq!(pair.to_string(), "de-en");
    }

    #[test]
    fn test_default_is_english_to_chinese() {
        let pair = LanguagePair::default();
        assert_eq!(pair, LanguagePair::new("en", "zh"));
        assert!(is_unspaced_language(&pair.to_lang));
        assert!(!is_unspaced_language(&pair.from_lang));
    }

    #[test]
    fn test_rejects_malformed_pairs() {
        assert!("enzh".parse::<LanguagePair>().is_err());
        assert!("en-".parse::<LanguagePair>().is_err());
        assert!("en-zh-ja".parse::<LanguagePair>().is_err());
    }
}
