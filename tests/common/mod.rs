// Shared fixtures for the integration tests
#![allow(dead_code)]

use docsift::config::ClassifierConfig;
use docsift::pdf_extraction::{DocumentExtractor, ExtractionRouter, QualityClassifier};
use docsift::{Document, ExtractionError, ExtractionMethod};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as PdfDocument, Object, Stream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const CLEAN_RECEIPT: &str = "Thank you for shopping with us today. The total amount paid \
                                 was twenty dollars in cash for bread, milk, cheese and fresh coffee.";

pub const OCR_RECEIPT: &str = "Store receipt. The item total was paid by card on this date. \
                               Thank you for your visit, please keep this receipt for your records.";

pub const GARBLED: &str = "%%%garbled%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%";

/// Extractor whose reply is computed from the document, counting every call.
pub struct Counting {
    method: ExtractionMethod,
    reply: Box<dyn Fn(&Document) -> Result<String, ExtractionError> + Send + Sync>,
    calls: Arc<AtomicUsize>,
}

impl Counting {
    pub fn new<F>(method: ExtractionMethod, reply: F) -> (Self, Arc<AtomicUsize>)
    where
        F: Fn(&Document) -> Result<String, ExtractionError> + Send + Sync + 'static,
    {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                method,
                reply: Box::new(reply),
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl DocumentExtractor for Counting {
    fn method(&self) -> ExtractionMethod {
        self.method
    }

    fn extract(&self, document: &Document) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)(document)
    }
}

/// Text layer that returns the file's bytes as text; files starting with
/// `SCANNED` look garbled, files starting with `CORRUPT` fail outright.
pub fn fake_text_layer() -> (Counting, Arc<AtomicUsize>) {
    Counting::new(ExtractionMethod::TextLayer, |doc| {
        let body = String::from_utf8_lossy(&doc.bytes).into_owned();
        if body.starts_with("CORRUPT") {
            Err(ExtractionError::Parse(format!("{} is corrupt", doc.name)))
        } else if body.starts_with("SCANNED") {
            Ok(GARBLED.to_string())
        } else {
            Ok(body)
        }
    })
}

/// OCR that reads every page as `OCR_RECEIPT`, except corrupt files and
/// files containing `UNRENDERABLE`.
pub fn fake_ocr() -> (Counting, Arc<AtomicUsize>) {
    Counting::new(ExtractionMethod::Ocr, |doc| {
        let body = String::from_utf8_lossy(&doc.bytes);
        if body.starts_with("CORRUPT") || body.contains("UNRENDERABLE") {
            Err(ExtractionError::Empty("pdftoppm"))
        } else {
            Ok(OCR_RECEIPT.to_string())
        }
    })
}

pub struct Harness {
    pub router: ExtractionRouter,
    pub primary_calls: Arc<AtomicUsize>,
    pub ocr_calls: Arc<AtomicUsize>,
}

pub fn harness_with(primary: (Counting, Arc<AtomicUsize>), ocr: (Counting, Arc<AtomicUsize>)) -> Harness {
    let router = ExtractionRouter::new(
        Box::new(primary.0),
        Box::new(ocr.0),
        QualityClassifier::new(ClassifierConfig::default()).unwrap(),
    );
    Harness {
        router,
        primary_calls: primary.1,
        ocr_calls: ocr.1,
    }
}

pub fn fake_harness() -> Harness {
    harness_with(fake_text_layer(), fake_ocr())
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// A one-font PDF with one page per entry. An empty entry yields a page with
/// no text operators at all, the way a scanned page looks to a text extractor.
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            vec![]
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![40.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
