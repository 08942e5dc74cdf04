// Persistent extraction cache: one JSON object mapping file name -> text
//
// Loaded once, rewritten in full after every insert. Keyed by file name only,
// no content hash and no expiry: delete the file (or `forget` a name) to force
// re-extraction. Single writer; two processes sharing a file lose updates.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::error::CacheError;

#[derive(Debug, Default)]
pub struct ExtractionCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl ExtractionCache {
    /// Load the cache at `path`. A missing file is an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();

        let entries = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| CacheError::Read {
                path: path.clone(),
                source,
            })?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|source| CacheError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };

        info!("Loaded {} cached extractions from {}", entries.len(), path.display());
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// A cache that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        if config.enabled {
            Self::open(&config.path)
        } else {
            Ok(Self::in_memory())
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert and flush. The first text stored under a name wins: returns
    /// `Ok(false)` without touching disk when the name is already cached.
    pub fn put(&mut self, name: &str, text: &str) -> Result<bool, CacheError> {
        if self.entries.contains_key(name) {
            debug!("cache already holds {}, keeping first extraction", name);
            return Ok(false);
        }
        self.entries.insert(name.to_string(), text.to_string());
        self.flush()?;
        Ok(true)
    }

    /// Drop one entry so the next run extracts it again.
    pub fn forget(&mut self, name: &str) -> Result<bool, CacheError> {
        if self.entries.remove(name).is_none() {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Rewrite the whole store. Writes a sibling temp file and renames it over
    /// the target so readers never see a half-written cache.
    pub fn flush(&self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut body = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut body, PrettyFormatter::with_indent(b"    "));
        self.entries.serialize(&mut serializer)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let write_err = |source: std::io::Error| CacheError::Write {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&dir).map_err(write_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(&body).map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        debug!("flushed {} cache entries to {}", self.entries.len(), path.display());
        Ok(())
    }
}
