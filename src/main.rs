//! yimt - Neural Machine Translation Serving
//!
//! Command-line entry point: translate text through a trained model, look up
//! words in a bilingual lexicon, and build SentencePiece vocabularies.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use yimt::cli::{Args, Commands};
use yimt::config::Config;
use yimt::error::YimtError;
use yimt::lang::LanguagePair;
use yimt::lexicon::WordTranslator;
use yimt::train::Trainer;
use yimt::translate::TranslatorFactory;
use yimt::vocab::{PretrainCorpus, TrainOptions, VocabBuilder};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Translate {
            model,
            sp_model,
            lang_pair,
            batch_size,
            text,
            input,
            output,
            combine_lines,
        } => {
            if let Some(batch_size) = batch_size {
                config.translator.batch_size = batch_size;
            }
            if combine_lines {
                config.translator.combine_lines = true;
            }
            config.validate()?;

            let model = model
                .or_else(|| config.translator.model_path.clone())
                .ok_or_else(|| YimtError::Config("No model given (--model or translator.model_path)".to_string()))?;
            let sp_model = sp_model
                .or_else(|| config.translator.sp_model_path.clone())
                .ok_or_else(|| YimtError::Config("No SentencePiece model given (--sp-model or translator.sp_model_path)".to_string()))?;

            let source = match (text, input) {
                (Some(text), _) => text,
                (None, Some(input)) => tokio::fs::read_to_string(&input)
                    .await
                    .with_context(|| format!("Failed to read {}", input.display()))?,
                (None, None) => return Err(YimtError::Config("Nothing to translate (--text or --input)".to_string()).into()),
            };

            let translator = TranslatorFactory::load_translator(&model, &sp_model, lang_pair.as_deref(), &config)?;
            info!(
                "Translator ready: {} backend, {}, batch size {}",
                translator.backend_kind(),
                translator.lang_pair(),
                translator.batch_size()
            );

            let translation = translator.translate_paragraph(&source).await?;

            match output {
                Some(output) => {
                    tokio::fs::write(&output, translation).await?;
                    info!("Translation written to {}", output.display());
                }
                None => println!("{}", translation),
            }
        }
        Commands::Lookup { lexicon, lang_pair, words } => {
            let lang_pair = match lang_pair {
                Some(pair) => pair.parse::<LanguagePair>()?,
                None => config.translator.lang_pair.clone(),
            };
            let lexicon = lexicon
                .or_else(|| config.lexicon.path.clone())
                .ok_or_else(|| YimtError::Config("No lexicon given (--lexicon or lexicon.path)".to_string()))?;

            let translator = WordTranslator::from_file(lang_pair, &lexicon)?;
            info!("Looking up {} words ({})", words.len(), translator.lang_pair());
            for word in &words {
                if translator.has(word) {
                    println!("{}\t{}", word, translator.lookup(word)?);
                } else {
                    println!("{}\t-", word);
                }
            }
        }
        Commands::SpTrain {
            corpus,
            prefix,
            vocab_size,
            max_sentences,
            coverage,
        } => {
            let mut options = TrainOptions::from(&config.sentencepiece);
            if let Some(vocab_size) = vocab_size {
                options.vocab_size = vocab_size;
            }
            if let Some(max_sentences) = max_sentences {
                options.max_sentences = max_sentences;
            }
            if let Some(coverage) = coverage {
                options.coverage = coverage;
            }

            let builder = VocabBuilder::new(&config.sentencepiece);
            let model_path = builder.train(&corpus, prefix.as_deref(), &options).await?;
            println!("{}", model_path.display());
        }
        Commands::SpEncode { model, input, output } => {
            let builder = VocabBuilder::new(&config.sentencepiece);
            builder.encode_file(&model, &input, &output).await?;
        }
        Commands::BuildVocab { corpus, size, output } => {
            let builder = VocabBuilder::new(&config.sentencepiece);
            let vocab_path = builder.build_vocab(&corpus, output.as_deref(), size).await?;
            println!("{}", vocab_path.display());
        }
        Commands::Pretrain {
            src_train,
            src_eval,
            src_vocab_size,
            tgt_train,
            tgt_eval,
            tgt_vocab_size,
            output,
            max_sentences,
            coverage,
        } => {
            let mut options = TrainOptions::from(&config.sentencepiece);
            if let Some(max_sentences) = max_sentences {
                options.max_sentences = max_sentences;
            }
            if let Some(coverage) = coverage {
                options.coverage = coverage;
            }

            let builder = VocabBuilder::new(&config.sentencepiece);
            let sides = [
                ("source", PretrainCorpus { train: src_train, eval: src_eval, vocab_size: src_vocab_size }),
                ("target", PretrainCorpus { train: tgt_train, eval: tgt_eval, vocab_size: tgt_vocab_size }),
            ];
            for (side, corpus) in &sides {
                let prepared = builder.pretrain(corpus, &output, &options).await?;
                info!("Prepared {} side", side);
                println!("{} sp_model\t{}", side, prepared.sp_model.display());
                println!("{} train\t{}", side, prepared.train_tokens.display());
                println!("{} eval\t{}", side, prepared.eval_tokens.display());
                println!("{} vocab\t{}", side, prepared.vocab.display());
            }
        }
        Commands::Train {
            config_file,
            model_type,
            with_eval,
            no_mixed_precision,
        } => {
            if let Some(model_type) = model_type {
                config.training.model_type = model_type;
            }
            if with_eval {
                config.training.with_eval = true;
            }
            if no_mixed_precision {
                config.training.mixed_precision = false;
            }

            let trainer = Trainer::new(&config.checkpoint, &config.training);
            trainer.train(&config_file).await?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".yimt").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "yimt.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr so translations on stdout stay clean
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
