// docsift: PDF text extraction with quality-gated OCR fallback
pub mod config;
pub mod corpus;
pub mod error;
pub mod generation;
pub mod logging;
pub mod pdf_extraction;
pub mod storage;
pub mod types;

pub use config::Config;
pub use corpus::{Corpus, CorpusEntry, CorpusProcessor, RunStats};
pub use error::{CacheError, ConfigError, ExtractionError, GenerationError, PipelineError};
pub use types::{Document, DocumentOutcome, ExtractionMethod, ExtractionResult, QualityVerdict};
