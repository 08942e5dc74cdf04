// docsift command line front end
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docsift::generation::{OllamaClient, QuestionAnswerer, Summarizer};
use docsift::pdf_extraction::{ExtractionRouter, OcrEngine, TextLayerExtractor};
use docsift::storage::ExtractionCache;
use docsift::{logging, Config, CorpusProcessor, Document};

#[derive(Parser)]
#[command(name = "docsift", version)]
#[command(about = "Extract text from PDFs (OCR when the text layer is garbage) and ask questions about it")]
struct Cli {
    /// Config file (default: ~/.config/docsift/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every PDF under a directory and print the joined text
    Extract {
        /// Directory to walk
        dir: PathBuf,
        /// Print per-document outcomes instead of the text
        #[arg(long)]
        report: bool,
    },
    /// Extract a directory, then ask questions about it
    Ask {
        /// Directory to walk
        dir: PathBuf,
        /// Question to ask (repeatable)
        #[arg(short, long = "question", required = true)]
        questions: Vec<String>,
        /// Model to ask instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Summarize text files or PDFs within a word limit
    Summarize {
        /// Files to summarize
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Word limit (default from config)
        #[arg(short, long)]
        words: Option<usize>,
        /// Model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Show how one PDF would be extracted
    Inspect {
        /// Path to PDF file
        pdf: PathBuf,
    },
    /// Inspect or edit the extraction cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached document names
    List,
    /// Drop one document so it is extracted again next run
    Forget {
        /// Document file name as stored in the cache
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    logging::install_panic_hook();

    let config = Config::load(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::Extract { dir, report } => extract(&config, &dir, report)?,
        Commands::Ask {
            dir,
            questions,
            model,
        } => ask(&config, &dir, &questions, model).await?,
        Commands::Summarize {
            files,
            words,
            model,
        } => {
            let limit = words.unwrap_or(config.generation.summary_word_limit);
            summarize(&config, files, limit, model).await?
        }
        Commands::Inspect { pdf } => inspect(&config, &pdf)?,
        Commands::Cache { action } => cache(&config, action)?,
    }

    Ok(())
}

fn build_corpus(config: &Config, dir: &Path) -> Result<docsift::Corpus> {
    let mut processor = CorpusProcessor::from_config(config).context("Failed to set up extraction")?;
    let corpus = processor
        .process_directory(dir)
        .with_context(|| format!("Failed to process {}", dir.display()))?;

    for failure in &corpus.cache_failures {
        eprintln!("warning: {}", failure);
    }
    for entry in corpus.failed() {
        eprintln!("warning: no text recovered from {}", entry.path.display());
    }
    Ok(corpus)
}

fn extract(config: &Config, dir: &Path, report: bool) -> Result<()> {
    let corpus = build_corpus(config, dir)?;

    if report {
        for entry in &corpus.entries {
            let method = entry.method.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string());
            println!("{:<10} {:<11} {:>7}  {}", entry.outcome, method, entry.text.len(), entry.name);
        }
        let s = corpus.stats;
        println!(
            "\n{} documents: {} cached, {} via OCR, {} failed",
            s.documents, s.cache_hits, s.ocr_runs, s.failures
        );
    } else {
        println!("{}", corpus.text());
    }
    Ok(())
}

fn ollama(config: &Config, model: Option<String>) -> Result<OllamaClient> {
    let client = OllamaClient::new(&config.generation).context("Failed to build HTTP client")?;
    Ok(match model {
        Some(model) => client.with_model(model),
        None => client,
    })
}

async fn ask(config: &Config, dir: &Path, questions: &[String], model: Option<String>) -> Result<()> {
    let corpus = build_corpus(config, dir)?;
    let context = corpus.text();
    if context.trim().is_empty() {
        bail!("No text extracted from {}", dir.display());
    }

    let qa = QuestionAnswerer::new(Arc::new(ollama(config, model)?));
    let mut failed = 0;
    for (question, answer) in qa.answer_all(&context, questions).await {
        println!("\nQuestion: {}", question);
        match answer {
            Ok(answer) => println!("Answer: {}", answer),
            Err(e) => {
                failed += 1;
                eprintln!("error: {}", e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} questions failed", failed, questions.len());
    }
    Ok(())
}

async fn summarize(config: &Config, files: Vec<PathBuf>, limit: usize, model: Option<String>) -> Result<()> {
    let text_layer = TextLayerExtractor::new();
    let mut texts = Vec::with_capacity(files.len());
    for file in &files {
        let is_pdf = file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        let text = if is_pdf {
            let document = Document::read(file)?;
            text_layer.extract_or_empty(&document)
        } else {
            std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?
        };
        texts.push(text);
    }

    let summarizer = Summarizer::new(Arc::new(ollama(config, model)?), config.generation.max_concurrency);
    let mut failed = 0;
    for (file, result) in files.iter().zip(summarizer.summarize_batch(texts, limit).await) {
        println!("\n== {} ==", file.display());
        match result {
            Ok(summary) => {
                println!("{}", summary.text);
                let marker = if summary.within_limit { "" } else { " (over limit)" };
                println!("[{} / {} words{}]", summary.word_count, summary.word_limit, marker);
            }
            Err(e) => {
                failed += 1;
                eprintln!("error: {}", e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} summaries failed", failed, files.len());
    }
    Ok(())
}

fn inspect(config: &Config, pdf: &Path) -> Result<()> {
    let document = Document::read(pdf)?;
    let router = ExtractionRouter::from_config(config)?;
    let routed = router.extract(&document);

    // no verdict means the text layer failed outright; score whatever came back instead
    let (verdict, scored) = match routed.result.verdict {
        Some(verdict) => (verdict, "text layer"),
        None => (router.classifier().classify(&routed.result.text), "final text"),
    };
    println!("File:               {}", document.name);
    println!("Scored:             {}", scored);
    println!("Words / valid:      {} / {}", verdict.total_words, verdict.valid_words);
    println!("Valid word ratio:   {:.2}", verdict.valid_word_ratio);
    println!("Special char ratio: {:.2}", verdict.special_char_ratio);
    println!("Garbled:            {}", verdict.garbled);
    println!(
        "OCR tools:          {}",
        if OcrEngine::new(config.ocr.clone()).is_available() {
            "available"
        } else {
            "missing"
        }
    );
    println!("Outcome:            {} via {}", routed.outcome, routed.result.method);
    println!("Text chars:         {}", routed.result.text.len());
    println!("Extraction time:    {}ms", routed.result.elapsed_ms);
    Ok(())
}

fn cache(config: &Config, action: CacheAction) -> Result<()> {
    let mut cache = ExtractionCache::from_config(&config.cache)?;
    match action {
        CacheAction::List => {
            for name in cache.names() {
                println!("{}", name);
            }
            eprintln!("{} entries", cache.len());
        }
        CacheAction::Forget { name } => {
            if cache.forget(&name)? {
                println!("Forgot {}", name);
            } else {
                bail!("{} is not cached", name);
            }
        }
    }
    Ok(())
}
