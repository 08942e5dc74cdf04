// Configuration for docsift: TOML file, then environment overrides
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_CACHE_FILE: &str = "extracted_text_cache.json";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub classifier: ClassifierConfig,
    pub cache: CacheConfig,
    pub ocr: OcrConfig,
    pub corpus: CorpusConfig,
    pub generation: GenerationConfig,
}

/// Thresholds for the garbled-text heuristic. Tunable, not derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub min_valid_words: usize,
    pub min_valid_word_ratio: f64,
    pub max_special_char_ratio: f64,
    pub min_word_len: usize,
    /// Extra word list (one word per line) merged into the built-in dictionary.
    pub dictionary_path: Option<PathBuf>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_valid_words: 10,
            min_valid_word_ratio: 0.2,
            max_special_char_ratio: 0.3,
            min_word_len: 3,
            dictionary_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CACHE_FILE),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    pub pdftoppm_path: String,
    pub tesseract_path: String,
    pub language: String,
    pub dpi: u32,
    pub grayscale: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            pdftoppm_path: "pdftoppm".to_string(),
            tesseract_path: "tesseract".to_string(),
            language: "eng".to_string(),
            dpi: 300,
            grayscale: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CorpusConfig {
    pub extensions: Vec<String>,
    pub sort_entries: bool,
    pub separator: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["pdf".to_string()],
            sort_entries: true,
            separator: "\n\n".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_concurrency: usize,
    pub summary_word_limit: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: "llama3".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            max_concurrency: 4,
            summary_word_limit: 50,
        }
    }
}

impl Config {
    /// Load config from `path`, or from the default location when `None`.
    /// A missing file yields defaults; environment overrides always apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let candidate = path.map(Path::to_path_buf).or_else(default_config_path);

        let mut config = match candidate {
            Some(p) if p.exists() => Self::from_file(&p)?,
            Some(p) if path.is_some() => {
                return Err(ConfigError::Read {
                    path: p,
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                })
            }
            _ => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("DOCSIFT_CACHE_PATH") {
            self.cache.path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("DOCSIFT_OLLAMA_URL") {
            self.generation.base_url = v;
        }
        if let Ok(v) = env::var("DOCSIFT_MODEL") {
            self.generation.model = v;
        }
        if let Ok(v) = env::var("DOCSIFT_TESSERACT") {
            self.ocr.tesseract_path = v;
        }
        if let Ok(v) = env::var("DOCSIFT_PDFTOPPM") {
            self.ocr.pdftoppm_path = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.classifier;
        for (name, value) in [
            ("classifier.min_valid_word_ratio", c.min_valid_word_ratio),
            ("classifier.max_special_char_ratio", c.max_special_char_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if c.min_word_len == 0 {
            return Err(ConfigError::Invalid("classifier.min_word_len must be > 0".into()));
        }
        if self.ocr.dpi == 0 {
            return Err(ConfigError::Invalid("ocr.dpi must be > 0".into()));
        }
        if self.generation.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "generation.max_concurrency must be > 0".into(),
            ));
        }
        if self.corpus.extensions.is_empty() {
            return Err(ConfigError::Invalid("corpus.extensions is empty".into()));
        }
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/docsift/config.toml` (or the platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("docsift").join("config.toml"))
}
