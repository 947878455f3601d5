use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::train::ModelType;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate text or a text file
    Translate {
        /// CTranslate2 model directory, SavedModel directory, or checkpoint config file
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// SentencePiece model for the source language
        #[arg(short, long)]
        sp_model: Option<PathBuf>,

        /// Language pair such as en-zh
        #[arg(short, long)]
        lang_pair: Option<String>,

        /// Number of sentences per inference batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Text to translate
        #[arg(short, long, conflicts_with = "input")]
        text: Option<String>,

        /// Input text file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Merge hard-wrapped lines into paragraphs; only blank lines separate paragraphs
        #[arg(long)]
        combine_lines: bool,
    },

    /// Look up words in a bilingual lexicon
    Lookup {
        /// JSON lexicon file
        #[arg(long)]
        lexicon: Option<PathBuf>,

        /// Language pair such as en-zh
        #[arg(short, long)]
        lang_pair: Option<String>,

        /// Words to look up
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Train a SentencePiece model from a corpus
    SpTrain {
        /// Corpus file
        #[arg(short, long)]
        corpus: PathBuf,

        /// Model path prefix (defaults to <corpus>-sp-<vocab_size>)
        #[arg(short, long)]
        prefix: Option<PathBuf>,

        /// Vocabulary size
        #[arg(long)]
        vocab_size: Option<u32>,

        /// Maximum number of sentences used for training
        #[arg(long)]
        max_sentences: Option<u64>,

        /// Character coverage
        #[arg(long)]
        coverage: Option<f64>,
    },

    /// Tokenize a corpus file with a SentencePiece model
    SpEncode {
        /// SentencePiece model file
        #[arg(short, long)]
        model: PathBuf,

        /// Input corpus file
        #[arg(short, long)]
        input: PathBuf,

        /// Output tokenized file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Build the model vocabulary of a tokenized corpus
    BuildVocab {
        /// Tokenized corpus file
        #[arg(short, long)]
        corpus: PathBuf,

        /// Vocabulary size
        #[arg(short, long, default_value_t = 4800)]
        size: u32,

        /// Vocabulary file (defaults to <corpus>.vocab)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Prepare both language sides for training: SentencePiece models, tokenized corpora and vocabularies
    Pretrain {
        /// Raw source training corpus
        #[arg(long)]
        src_train: PathBuf,

        /// Raw source evaluation corpus
        #[arg(long)]
        src_eval: PathBuf,

        /// Source vocabulary size
        #[arg(long, default_value_t = 4800)]
        src_vocab_size: u32,

        /// Raw target training corpus
        #[arg(long)]
        tgt_train: PathBuf,

        /// Raw target evaluation corpus
        #[arg(long)]
        tgt_eval: PathBuf,

        /// Target vocabulary size
        #[arg(long, default_value_t = 4800)]
        tgt_vocab_size: u32,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Maximum number of sentences used for SentencePiece training
        #[arg(long)]
        max_sentences: Option<u64>,

        /// Character coverage
        #[arg(long)]
        coverage: Option<f64>,
    },

    /// Train a model from a training config file
    Train {
        /// Training config file (YAML)
        #[arg(long)]
        config_file: PathBuf,

        /// Model architecture (Transformer or TransformerBig)
        #[arg(short, long)]
        model_type: Option<ModelType>,

        /// Evaluate during training
        #[arg(long)]
        with_eval: bool,

        /// Train in full precision
        #[arg(long)]
        no_mixed_precision: bool,
    },
}
