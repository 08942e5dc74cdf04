// Per-document routing: text layer first, OCR only when the text is garbled
//
//   Unseen -> TextLayer -> Accepted
//                       -> Escalated -> OCR
//
// Both extractors sit behind DocumentExtractor so callers can swap in
// counting or canned implementations.

use std::time::Instant;
use tracing::{debug, info, warn};

use super::ocr_engine::OcrEngine;
use super::quality::QualityClassifier;
use super::text_layer::TextLayerExtractor;
use super::DocumentExtractor;
use crate::config::Config;
use crate::error::ConfigError;
use crate::types::{Document, DocumentOutcome, ExtractionMethod, ExtractionResult};

/// What the router decided for one document.
#[derive(Debug, Clone)]
pub struct RoutedExtraction {
    pub result: ExtractionResult,
    pub outcome: DocumentOutcome,
}

impl RoutedExtraction {
    pub fn is_failure(&self) -> bool {
        self.outcome == DocumentOutcome::Failed
    }
}

pub struct ExtractionRouter {
    primary: Box<dyn DocumentExtractor>,
    fallback: Box<dyn DocumentExtractor>,
    classifier: QualityClassifier,
}

impl ExtractionRouter {
    pub fn new(
        primary: Box<dyn DocumentExtractor>,
        fallback: Box<dyn DocumentExtractor>,
        classifier: QualityClassifier,
    ) -> Self {
        Self {
            primary,
            fallback,
            classifier,
        }
    }

    /// Text layer via pdf-extract/lopdf, OCR via pdftoppm + tesseract.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(
            Box::new(TextLayerExtractor::new()),
            Box::new(OcrEngine::new(config.ocr.clone())),
            QualityClassifier::new(config.classifier.clone())?,
        ))
    }

    pub fn classifier(&self) -> &QualityClassifier {
        &self.classifier
    }

    pub fn extract(&self, document: &Document) -> RoutedExtraction {
        let start = Instant::now();

        let verdict = match self.primary.extract(document) {
            Ok(text) => {
                let verdict = self.classifier.classify(&text);
                debug!(
                    "{}: {} of {} words valid (ratio {:.2}), special chars {:.2}",
                    document.name,
                    verdict.valid_words,
                    verdict.total_words,
                    verdict.valid_word_ratio,
                    verdict.special_char_ratio
                );
                if verdict.is_usable() {
                    return RoutedExtraction {
                        result: ExtractionResult {
                            text,
                            method: self.primary.method(),
                            verdict: Some(verdict),
                            elapsed_ms: start.elapsed().as_millis() as u64,
                        },
                        outcome: DocumentOutcome::Accepted,
                    };
                }
                warn!("Text extraction issue detected in {}, using OCR", document.name);
                Some(verdict)
            }
            Err(e) => {
                warn!("Text layer unreadable for {} ({}), using OCR", document.name, e);
                None
            }
        };

        match self.fallback.extract(document) {
            Ok(text) => {
                info!("{}: recovered {} chars via {}", document.name, text.len(), self.fallback.method());
                RoutedExtraction {
                    result: ExtractionResult {
                        text,
                        method: self.fallback.method(),
                        verdict,
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    },
                    outcome: DocumentOutcome::Escalated,
                }
            }
            Err(e) => {
                warn!("OCR failed for {}: {}", document.name, e);
                RoutedExtraction {
                    result: ExtractionResult {
                        text: String::new(),
                        method: ExtractionMethod::Ocr,
                        verdict,
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    },
                    outcome: DocumentOutcome::Failed,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;
    use crate::error::ExtractionError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const CLEAN: &str = "Thank you for your visit. The store sold fresh bread, milk, \
                         cheese and coffee today. Total amount paid with cash.";

    struct Canned {
        method: ExtractionMethod,
        reply: Result<&'static str, ()>,
        calls: Arc<AtomicUsize>,
    }

    impl DocumentExtractor for Canned {
        fn method(&self) -> ExtractionMethod {
            self.method
        }

        fn extract(&self, _document: &Document) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .map(str::to_string)
                .map_err(|_| ExtractionError::Parse("canned failure".into()))
        }
    }

    fn router(
        primary: Result<&'static str, ()>,
        ocr: Result<&'static str, ()>,
    ) -> (ExtractionRouter, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let ocr_calls = Arc::new(AtomicUsize::new(0));
        let router = ExtractionRouter::new(
            Box::new(Canned {
                method: ExtractionMethod::TextLayer,
                reply: primary,
                calls: primary_calls.clone(),
            }),
            Box::new(Canned {
                method: ExtractionMethod::Ocr,
                reply: ocr,
                calls: ocr_calls.clone(),
            }),
            QualityClassifier::new(ClassifierConfig::default()).unwrap(),
        );
        (router, primary_calls, ocr_calls)
    }

    fn doc() -> Document {
        Document::new("receipt.pdf", b"%PDF".to_vec())
    }

    #[test]
    fn test_clean_text_layer_is_accepted() {
        let (router, primary, ocr) = router(Ok(CLEAN), Ok("ocr text"));
        let routed = router.extract(&doc());

        assert_eq!(routed.outcome, DocumentOutcome::Accepted);
        assert_eq!(routed.result.method, ExtractionMethod::TextLayer);
        assert_eq!(routed.result.text, CLEAN);
        assert_eq!(primary.load(Ordering::SeqCst), 1);
        assert_eq!(ocr.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_garbled_text_layer_escalates() {
        let (router, _, ocr) = router(Ok("%%%garbled%%%%%%%%%%%%"), Ok(CLEAN));
        let routed = router.extract(&doc());

        assert_eq!(routed.outcome, DocumentOutcome::Escalated);
        assert_eq!(routed.result.method, ExtractionMethod::Ocr);
        assert_eq!(routed.result.text, CLEAN);
        assert!(routed.result.verdict.unwrap().garbled);
        assert_eq!(ocr.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_primary_failure_escalates_without_verdict() {
        let (router, _, ocr) = router(Err(()), Ok(CLEAN));
        let routed = router.extract(&doc());

        assert_eq!(routed.outcome, DocumentOutcome::Escalated);
        assert!(routed.result.verdict.is_none());
        assert_eq!(ocr.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ocr_failure_after_garbled_text_discards_it() {
        let (router, primary, ocr) = router(Ok("%%%garbled%%%%%%%%%%%%"), Err(()));
        let routed = router.extract(&doc());

        assert!(routed.is_failure());
        assert!(routed.result.text.is_empty());
        assert_eq!(routed.result.method, ExtractionMethod::Ocr);
        assert!(routed.result.verdict.unwrap().garbled);
        assert_eq!(primary.load(Ordering::SeqCst), 1);
        assert_eq!(ocr.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_both_failing_yields_empty_failure() {
        let (router, _, _) = router(Err(()), Err(()));
        let routed = router.extract(&doc());

        assert!(routed.is_failure());
        assert!(routed.result.text.is_empty());
    }
}
