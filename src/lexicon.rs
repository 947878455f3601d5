use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::{Result, YimtError};
use crate::lang::LanguagePair;

/// Word/phrase translator backed by a bilingual lexicon keyed by lowercase word
#[derive(Debug, Clone)]
pub struct WordTranslator {
    lang_pair: LanguagePair,
    lexicon: HashMap<String, Vec<String>>,
}

impl WordTranslator {
    /// Build from (word, translations) entries; keys are lowercased
    pub fn from_entries<I, S>(lang_pair: LanguagePair, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: AsRef<str>,
    {
        let mut lexicon: HashMap<String, Vec<String>> = HashMap::new();
        for (word, translations) in entries {
            lexicon
                .entry(word.as_ref().to_lowercase())
                .or_default()
                .extend(translations);
        }

        Self { lang_pair, lexicon }
    }

    /// Load a JSON lexicon mapping each word to its list of translations
    pub fn from_file<P: AsRef<Path>>(lang_pair: LanguagePair, path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(YimtError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let entries: HashMap<String, Vec<String>> = serde_json::from_str(&content)?;

        info!("Loaded {} lexicon entries for {} from {}", entries.len(), lang_pair, path.display());
        Ok(Self::from_entries(lang_pair, entries))
    }

    pub fn lang_pair(&self) -> &LanguagePair {
        &self.lang_pair
    }

    /// Does the word exist?
    pub fn has(&self, word: &str) -> bool {
        self.lexicon.contains_key(&word.to_lowercase())
    }

    /// Get the first listed translation of the word
    pub fn lookup(&self, word: &str) -> Result<&str> {
        self.lexicon
            .get(&word.to_lowercase())
            .and_then(|translations| translations.first())
            .map(String::as_str)
            .ok_or_else(|| YimtError::WordNotFound(word.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> WordTranslator {
        WordTranslator::from_entries(
            LanguagePair::default(),
            vec![
                ("Apple", vec!["苹果".to_string(), "苹果公司".to_string()]),
                ("book", vec!["书".to_string()]),
            ],
        )
    }

    #[test]
    fn test_has_is_case_insensitive() {
        let words = lexicon();
        assert!(words.has("apple"));
        assert!(words.has("APPLE"));
        assert!(words.has("Book"));
        assert!(!words.has("pear"));
    }

    #[test]
    fn test_lookup_returns_first_translation() {
        let words = lexicon();
        assert_eq!(words.lookup("apple").unwrap(), "苹果");
        assert_eq!(words.lookup("BOOK").unwrap(), "书");
    }

    #[test]
    fn test_lookup_absent_word_fails() {
        let words = lexicon();
        assert!(matches!(words.lookup("pear"), Err(YimtError::WordNotFound(w)) if w == "pear"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en-zh.json");
        std::fs::write(&path, r#"{"Hello": ["你好"], "world": ["世界", "天下"]}"#).unwrap();

        let words = WordTranslator::from_file(LanguagePair::default(), &path).unwrap();
        assert_eq!(words.lookup("hello").unwrap(), "你好");
        assert_eq!(words.lookup("World").unwrap(), "世界");

        let missing = WordTranslator::from_file(LanguagePair::default(), dir.path().join("none.json"));
        assert!(matches!(missing, Err(YimtError::FileNotFound(_))));
    }
}
