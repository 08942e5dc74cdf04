// Shared types for the extraction pipeline
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExtractionError;

/// A single input file: its name (the cache key) and its bytes.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            bytes,
        }
    }

    /// Read a document from disk. The name is the file name, not the full path.
    pub fn read(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = fs::read(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            name: document_name(path),
            path: path.to_path_buf(),
            bytes,
        })
    }
}

pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionMethod {
    TextLayer,
    Ocr,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::TextLayer => write!(f, "text-layer"),
            ExtractionMethod::Ocr => write!(f, "ocr"),
        }
    }
}

/// Outcome of the garbled-text heuristic, with the ratios that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityVerdict {
    pub garbled: bool,
    pub total_words: usize,
    pub valid_words: usize,
    pub valid_word_ratio: f64,
    pub special_char_ratio: f64,
}

impl QualityVerdict {
    pub fn is_usable(&self) -> bool {
        !self.garbled
    }
}

/// Text recovered from one document and the method that produced it.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
    /// Verdict on the text-layer output; `None` when the text layer was never classified.
    pub verdict: Option<QualityVerdict>,
    pub elapsed_ms: u64,
}

/// Terminal state of one document in a corpus run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentOutcome {
    CacheHit,
    Accepted,
    Escalated,
    Failed,
}

impl fmt::Display for DocumentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentOutcome::CacheHit => "cache-hit",
            DocumentOutcome::Accepted => "accepted",
            DocumentOutcome::Escalated => "escalated",
            DocumentOutcome::Failed => "failed",
        };
        f.write_str(label)
    }
}
