use tracing::debug;

use crate::error::{Result, YimtError};
use crate::lang::is_unspaced_language;
use super::{Breaks, ParagraphBreak, ParagraphSegmenter, Segmentation};

/// Abbreviations whose trailing period does not end a sentence
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "fig",
];

/// Rule-based segmenter: one paragraph per non-blank line, sentences split on
/// terminal punctuation.
///
/// With line combining enabled, consecutive non-blank lines form a single
/// paragraph, so hard-wrapped text is segmented as running prose. Only blank
/// lines separate paragraphs then, and the wrapped line breaks are not restored.
#[derive(Debug, Default, Clone)]
pub struct RuleSegmenter {
    combine_lines: bool,
}

impl RuleSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge hard-wrapped lines into one paragraph before splitting sentences
    pub fn with_line_combining(mut self, combine_lines: bool) -> Self {
        self.combine_lines = combine_lines;
        self
    }

    /// Split a single paragraph into trimmed sentences
    pub fn split_sentences(&self, paragraph: &str, lang: &str) -> Vec<String> {
        let unspaced_source = is_unspaced_language(lang);
        let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
        let mut sentences = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            let (pos, ch) = chars[i];
            if !is_terminator(ch) {
                i += 1;
                continue;
            }

            // Runs like "?!" or ".)" belong to the sentence they close
            let mut j = i + 1;
            while j < chars.len() && (is_terminator(chars[j].1) || is_closer(chars[j].1)) {
                j += 1;
            }
            let end = chars.get(j).map_or(paragraph.len(), |&(p, _)| p);
            let at_boundary = is_fullwidth_terminator(ch)
                || j == chars.len()
                || chars[j].1.is_whitespace()
                || (unspaced_source && ch != '.');

            let abbreviated = ch == '.'
                && !unspaced_source
                && ends_with_abbreviation(&paragraph[start..pos], &paragraph[end..]);

            if at_boundary && !abbreviated {
                let sentence = paragraph[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = end;
            }
            i = j;
        }

        let tail = paragraph[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }

        sentences
    }
}

impl ParagraphSegmenter for RuleSegmenter {
    fn segment(&self, text: &str, lang: &str) -> Segmentation {
        let content_start = text.len() - text.trim_start().len();
        let mut segmentation = Segmentation::default();
        segmentation.breaks.leading = text[..content_start].to_string();

        let line_joiner = if is_unspaced_language(lang) { "" } else { " " };
        let mut paragraph = String::new();
        let mut rest = &text[content_start..];
        while !rest.is_empty() {
            let line_end = rest.find('\n').unwrap_or(rest.len());
            let line = rest[..line_end].trim_end();
            let after_line = &rest[line.len()..];
            let next_start = after_line.len() - after_line.trim_start().len();
            let trailing = &after_line[..next_start];
            rest = &after_line[next_start..];

            if !paragraph.is_empty() {
                paragraph.push_str(line_joiner);
            }
            paragraph.push_str(line);

            // A single line break inside a block is a hard wrap
            if self.combine_lines && !rest.is_empty() && trailing.matches('\n').count() == 1 {
                continue;
            }

            let sentences = self.split_sentences(&paragraph, lang);
            segmentation.breaks.paragraphs.push(ParagraphBreak {
                sentence_count: sentences.len(),
                trailing: trailing.to_string(),
            });
            segmentation.sentences.extend(sentences);
            paragraph.clear();
        }

        debug!(
            "Segmented text into {} paragraphs, {} sentences",
            segmentation.breaks.paragraphs.len(),
            segmentation.sentences.len()
        );
        segmentation
    }

    fn reassemble(&self, translations: Vec<String>, breaks: Breaks, lang: &str) -> Result<String> {
        let expected = breaks.sentence_count();
        if translations.len() != expected {
            return Err(YimtError::Segmentation(format!(
                "Expected {} translated sentences, got {}",
                expected,
                translations.len()
            )));
        }

        let joiner = if is_unspaced_language(lang) { "" } else { " " };
        let mut text = breaks.leading;
        let mut translations = translations.into_iter();

        for paragraph in breaks.paragraphs {
            let sentences: Vec<String> = translations.by_ref().take(paragraph.sentence_count).collect();
            text.push_str(&sentences.join(joiner));
            text.push_str(&paragraph.trailing);
        }

        Ok(text)
    }
}

fn is_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?') || is_fullwidth_terminator(ch)
}

fn is_fullwidth_terminator(ch: char) -> bool {
    matches!(ch, '。' | '！' | '？')
}

fn is_closer(ch: char) -> bool {
    matches!(ch, '"' | '\'' | ')' | ']' | '”' | '’' | '」' | '』' | '）')
}

/// Whether the period closing `before` belongs to an abbreviation rather than
/// ending the sentence; `after` is the text following the period
fn ends_with_abbreviation(before: &str, after: &str) -> bool {
    let mut words = before.split_whitespace().rev();
    let Some(word) = words.next() else {
        return false;
    };
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    let lower = word.to_lowercase();
    let next = after.split_whitespace().next().unwrap_or("");

    if ABBREVIATIONS.contains(&lower.as_str()) {
        return true;
    }
    // "No. 5"
    if lower == "no" {
        return next.starts_with(|c: char| c.is_ascii_digit());
    }
    // Runs of initials such as "J. R. Smith", never a lone capital
    if is_initial(word) {
        let previous_is_initial = words
            .next()
            .and_then(|w| w.strip_suffix('.'))
            .is_some_and(|w| is_initial(w.trim_start_matches(|c: char| !c.is_alphanumeric())));
        let next_is_initial = next.strip_suffix('.').is_some_and(is_initial);
        return previous_is_initial || next_is_initial;
    }
    false
}

fn is_initial(word: &str) -> bool {
    let mut chars = word.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase())
}
