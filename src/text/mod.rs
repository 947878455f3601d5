// Paragraph segmentation and reassembly
//
// The translator never looks at raw text layout. The segmenter flattens a
// text into a sentence list plus break markers, and the same markers rebuild
// the paragraph structure around the translated sentences.

pub mod splitter;

pub use splitter::*;

use crate::error::Result;

/// Layout of one paragraph inside the flattened sentence list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphBreak {
    /// Number of sentences this paragraph contributed
    pub sentence_count: usize,
    /// Whitespace that followed the paragraph in the source text
    pub trailing: String,
}

/// Break markers recorded at segmentation time, consumed once at reassembly
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breaks {
    /// Whitespace before the first paragraph
    pub leading: String,
    pub paragraphs: Vec<ParagraphBreak>,
}

impl Breaks {
    /// Total number of sentences the markers expect back
    pub fn sentence_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.sentence_count).sum()
    }
}

/// Sentences of a text in reading order plus the markers to rebuild it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub sentences: Vec<String>,
    pub breaks: Breaks,
}

/// Splits text into sentences and reassembles translated sentences
pub trait ParagraphSegmenter: Send + Sync {
    /// Split raw text into sentences, recording paragraph breaks
    fn segment(&self, text: &str, lang: &str) -> Segmentation;

    /// Rebuild paragraphs from translated sentences using the recorded breaks
    fn reassemble(&self, translations: Vec<String>, breaks: Breaks, lang: &str) -> Result<String>;
}

/// Factory for creating paragraph segmenters
pub struct SegmenterFactory;

impl SegmenterFactory {
    /// Create the default rule-based segmenter
    pub fn create_default() -> Box<dyn ParagraphSegmenter> {
        Box::new(RuleSegmenter::new())
    }

    /// Create the rule-based segmenter, optionally merging hard-wrapped lines
    pub fn create(combine_lines: bool) -> Box<dyn ParagraphSegmenter> {
        Box::new(RuleSegmenter::new().with_line_combining(combine_lines))
    }
}
