// Error taxonomy, one enum per component
use std::path::PathBuf;
use thiserror::Error;

/// A document could not be turned into text by one extractor.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse document: {0}")]
    Parse(String),

    #[error("{tool} exited with status {status}: {stderr}")]
    Tool {
        tool: String,
        status: i32,
        stderr: String,
    },

    #[error("{tool} is not installed or not on PATH ({reason})")]
    ToolMissing { tool: String, reason: String },

    #[error("{0} produced no output")]
    Empty(&'static str),
}

/// The persisted extraction cache could not be read or written.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read cache {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache {path} is not a JSON object of strings: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write cache {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The remote text-generation capability failed. Never turned into an answer.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("could not reach {url}: {message}")]
    Transport { url: String, message: String },

    #[error("remote returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("generation task failed: {0}")]
    Task(String),
}

impl GenerationError {
    /// Status code reported by the remote, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GenerationError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that stop a corpus run. Per-document failures never do.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot walk {root}: {message}")]
    Walk { root: PathBuf, message: String },
}
