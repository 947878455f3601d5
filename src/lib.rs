//! yimt - Neural Machine Translation Serving
//!
//! Translates text through SentencePiece tokenization, sentence batching and one
//! of three inference backends (CTranslate2, exported SavedModel, training
//! checkpoint), preserving the paragraph layout of the source text.

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod lang;
pub mod lexicon;
pub mod text;
pub mod tokenizer;
pub mod train;
pub mod translate;
pub mod vocab;
