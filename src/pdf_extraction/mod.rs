// PDF extraction module
pub mod extraction_router;
pub mod ocr_engine;
pub mod quality;
pub mod text_layer;

pub use extraction_router::{ExtractionRouter, RoutedExtraction};
pub use ocr_engine::OcrEngine;
pub use quality::QualityClassifier;
pub use text_layer::TextLayerExtractor;

use crate::error::ExtractionError;
use crate::types::{Document, ExtractionMethod};

/// Anything that can turn a document's bytes into plain text.
pub trait DocumentExtractor: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    fn extract(&self, document: &Document) -> Result<String, ExtractionError>;
}
