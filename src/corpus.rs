// Corpus processor: walk a directory, extract every document, join the texts
//
// Per document: cache hit -> emit cached text (file never opened)
//               cache miss -> router -> cache write -> emit
// One bad document never stops the run; it contributes an empty segment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{Config, CorpusConfig};
use crate::error::{CacheError, PipelineError};
use crate::pdf_extraction::ExtractionRouter;
use crate::storage::ExtractionCache;
use crate::types::{document_name, Document, DocumentOutcome, ExtractionMethod};

/// One document's contribution to the corpus.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub name: String,
    pub path: PathBuf,
    pub text: String,
    pub outcome: DocumentOutcome,
    /// `None` for cache hits: the cache does not remember which extractor ran.
    pub method: Option<ExtractionMethod>,
}

/// Counters for one run. Extractor invocations are counted here so callers
/// can verify that a warm cache did no work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub documents: usize,
    pub cache_hits: usize,
    pub primary_runs: usize,
    pub ocr_runs: usize,
    pub failures: usize,
}

#[derive(Debug)]
pub struct Corpus {
    pub entries: Vec<CorpusEntry>,
    pub stats: RunStats,
    /// Cache writes that failed. The texts are still in `entries`, they just
    /// will not be reused next run.
    pub cache_failures: Vec<CacheError>,
    separator: String,
}

impl Corpus {
    /// All segments joined by the separator, in processing order.
    pub fn text(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CorpusEntry> {
        self.entries
            .iter()
            .filter(|e| e.outcome == DocumentOutcome::Failed)
    }
}

pub struct CorpusProcessor {
    router: ExtractionRouter,
    cache: ExtractionCache,
    config: CorpusConfig,
}

impl CorpusProcessor {
    pub fn new(router: ExtractionRouter, cache: ExtractionCache, config: CorpusConfig) -> Self {
        Self {
            router,
            cache,
            config,
        }
    }

    /// Real extractors plus the configured cache. Fails before any document is
    /// touched when the cache file exists but cannot be loaded.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let router = ExtractionRouter::from_config(config)?;
        let cache = ExtractionCache::from_config(&config.cache)?;
        Ok(Self::new(router, cache, config.corpus.clone()))
    }

    pub fn cache(&self) -> &ExtractionCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ExtractionCache {
        &mut self.cache
    }

    pub fn into_cache(self) -> ExtractionCache {
        self.cache
    }

    /// Document files under `root`, recursively, in processing order.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        if !root.is_dir() {
            return Err(PipelineError::Walk {
                root: root.to_path_buf(),
                message: "not a directory".to_string(),
            });
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_file() && self.has_document_extension(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        if self.config.sort_entries {
            paths.sort_by(|a, b| document_name(a).cmp(&document_name(b)).then_with(|| a.cmp(b)));
        }

        let mut seen: HashMap<String, &Path> = HashMap::new();
        for path in &paths {
            if let Some(first) = seen.insert(document_name(path), path) {
                warn!(
                    "{} and {} share a file name; the cache will serve one text for both",
                    first.display(),
                    path.display()
                );
            }
        }

        debug!("found {} documents under {}", paths.len(), root.display());
        Ok(paths)
    }

    pub fn process_directory(&mut self, root: &Path) -> Result<Corpus, PipelineError> {
        let paths = self.discover(root)?;
        info!("Processing {} documents from {}", paths.len(), root.display());
        Ok(self.process_paths(&paths))
    }

    /// Run the given files in order. Never fails as a whole.
    pub fn process_paths(&mut self, paths: &[PathBuf]) -> Corpus {
        let mut corpus = Corpus {
            entries: Vec::with_capacity(paths.len()),
            stats: RunStats::default(),
            cache_failures: Vec::new(),
            separator: self.config.separator.clone(),
        };

        for path in paths {
            let entry = self.process_one(path, &mut corpus);
            corpus.stats.documents += 1;
            corpus.entries.push(entry);
        }

        info!(
            "Corpus ready: {} documents, {} cached, {} via OCR, {} failed",
            corpus.stats.documents, corpus.stats.cache_hits, corpus.stats.ocr_runs, corpus.stats.failures
        );
        corpus
    }

    fn process_one(&mut self, path: &Path, corpus: &mut Corpus) -> CorpusEntry {
        let name = document_name(path);

        if let Some(text) = self.cache.get(&name) {
            debug!("cache hit for {}", name);
            corpus.stats.cache_hits += 1;
            return CorpusEntry {
                name,
                path: path.to_path_buf(),
                text: text.to_string(),
                outcome: DocumentOutcome::CacheHit,
                method: None,
            };
        }

        info!("Processing: {}", name);
        let document = match Document::read(path) {
            Ok(document) => document,
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                corpus.stats.failures += 1;
                return CorpusEntry {
                    name,
                    path: path.to_path_buf(),
                    text: String::new(),
                    outcome: DocumentOutcome::Failed,
                    method: None,
                };
            }
        };

        let routed = self.router.extract(&document);
        corpus.stats.primary_runs += 1;
        if routed.outcome != DocumentOutcome::Accepted {
            corpus.stats.ocr_runs += 1;
        }

        if routed.is_failure() {
            corpus.stats.failures += 1;
        } else if let Err(e) = self.cache.put(&name, &routed.result.text) {
            warn!("Could not cache {}: {}", name, e);
            corpus.cache_failures.push(e);
        }

        CorpusEntry {
            name,
            path: path.to_path_buf(),
            text: routed.result.text,
            outcome: routed.outcome,
            method: Some(routed.result.method),
        }
    }

    fn has_document_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.config
            .extensions
            .iter()
            .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}
