// Garbled-text detection for text-layer output
//
// Dictionary heuristic: count 3+ letter tokens that are English words and the
// share of symbol characters. Cheap enough to run on every document so OCR
// only happens when the text layer is junk.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs;

use crate::config::ClassifierConfig;
use crate::error::ConfigError;
use crate::types::QualityVerdict;

static BUILTIN_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    include_str!("../../assets/english_words.txt")
        .lines()
        .map(str::trim)
        .filter(|w| !w.is_empty() && !w.starts_with('#'))
        .collect()
});

pub struct QualityClassifier {
    config: ClassifierConfig,
    word_pattern: Regex,
    extra_words: HashSet<String>,
}

impl QualityClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ConfigError> {
        let word_pattern = Regex::new(&format!(r"\b[a-zA-Z]{{{},}}\b", config.min_word_len))
            .map_err(|e| ConfigError::Invalid(format!("bad word pattern: {}", e)))?;

        let extra_words = match &config.dictionary_path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                raw.lines()
                    .map(|w| w.trim().to_ascii_lowercase())
                    .filter(|w| !w.is_empty())
                    .collect()
            }
            None => HashSet::new(),
        };

        Ok(Self {
            config,
            word_pattern,
            extra_words,
        })
    }

    /// Add words at runtime, e.g. merchant names that keep showing up on receipts.
    pub fn extend_dictionary<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_words
            .extend(words.into_iter().map(|w| w.as_ref().trim().to_ascii_lowercase()));
    }

    pub fn is_english_word(&self, word: &str) -> bool {
        let lower = word.to_ascii_lowercase();
        BUILTIN_WORDS.contains(lower.as_str()) || self.extra_words.contains(&lower)
    }

    pub fn classify(&self, text: &str) -> QualityVerdict {
        let tokens: Vec<&str> = self.word_pattern.find_iter(text).map(|m| m.as_str()).collect();
        let valid_words = tokens.iter().filter(|w| self.is_english_word(w)).count();

        // No tokens at all is indeterminate; treat as 0 so it lands on garbled
        let valid_word_ratio = if tokens.is_empty() {
            0.0
        } else {
            valid_words as f64 / tokens.len() as f64
        };

        let total_chars = text.chars().count();
        let special_chars = text
            .chars()
            .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
            .count();
        let special_char_ratio = special_chars as f64 / total_chars.max(1) as f64;

        let garbled = valid_words < self.config.min_valid_words
            || valid_word_ratio < self.config.min_valid_word_ratio
            || special_char_ratio > self.config.max_special_char_ratio;

        QualityVerdict {
            garbled,
            total_words: tokens.len(),
            valid_words,
            valid_word_ratio,
            special_char_ratio,
        }
    }

    pub fn is_garbled(&self, text: &str) -> bool {
        self.classify(text).garbled
    }
}
