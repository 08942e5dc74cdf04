// Text-layer extraction: the cheap path, no image analysis
//
// pdf-extract handles font encodings well but can panic on malformed fonts,
// so it runs inside catch_unwind. When it fails or finds nothing we walk the
// content streams with lopdf, which is cruder but tolerant of broken files.

use lopdf::content::Content;
use lopdf::{Document as PdfDocument, Object};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, warn};

use super::DocumentExtractor;
use crate::error::ExtractionError;
use crate::types::{Document, ExtractionMethod};

#[derive(Debug, Default, Clone, Copy)]
pub struct TextLayerExtractor;

impl TextLayerExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract text from raw PDF bytes in page order.
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        // The process panic hook still runs before the unwind is caught, so the
        // default hook prints the pdf-extract message to stderr; the binary
        // installs a hook that sends it to tracing instead.
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));

        match attempt {
            Ok(Ok(text)) if !text.trim().is_empty() => return Ok(text.trim().to_string()),
            Ok(Ok(_)) => debug!("pdf-extract found no text, walking content streams"),
            Ok(Err(e)) => debug!("pdf-extract failed ({}), walking content streams", e),
            Err(_) => warn!("pdf-extract panicked, walking content streams"),
        }

        extract_via_content_streams(bytes).map(|text| text.trim().to_string())
    }

    /// Never fails: logs the cause and returns "" so the caller escalates to OCR.
    pub fn extract_or_empty(&self, document: &Document) -> String {
        match self.extract(document) {
            Ok(text) => text,
            Err(e) => {
                warn!("text layer extraction failed for {}: {}", document.name, e);
                String::new()
            }
        }
    }
}

impl DocumentExtractor for TextLayerExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::TextLayer
    }

    fn extract(&self, document: &Document) -> Result<String, ExtractionError> {
        let start = Instant::now();
        let text = self.extract_bytes(&document.bytes)?;
        debug!(
            "text layer: {} -> {} chars in {}ms",
            document.name,
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

/// Walk Tj / TJ / ' / " operators page by page.
pub fn extract_via_content_streams(bytes: &[u8]) -> Result<String, ExtractionError> {
    let doc = PdfDocument::load_mem(bytes).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    let mut all_text = String::new();

    // get_pages is keyed by page number, so this is page order
    for (_page_num, page_id) in doc.get_pages() {
        let content = match doc.get_page_content(page_id) {
            Ok(content) => content,
            Err(e) => {
                debug!("skipping unreadable page content: {}", e);
                continue;
            }
        };
        let operations = Content::decode(&content)
            .map(|c| c.operations)
            .unwrap_or_default();

        for op in operations {
            match op.operator.as_str() {
                "Tj" | "'" => {
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        all_text.push_str(&decode_pdf_string(bytes));
                    }
                }
                "\"" => {
                    if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                        all_text.push_str(&decode_pdf_string(bytes));
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = op.operands.first() {
                        for item in items {
                            if let Object::String(bytes, _) = item {
                                all_text.push_str(&decode_pdf_string(bytes));
                            }
                        }
                    }
                }
                "Td" | "TD" | "T*" => {
                    if !all_text.is_empty() && !all_text.ends_with(|c: char| c == '\n' || c == ' ') {
                        all_text.push(' ');
                    }
                }
                "ET" => {
                    if !all_text.ends_with('\n') {
                        all_text.push('\n');
                    }
                }
                _ => {}
            }
        }
        all_text.push('\n');
    }

    Ok(all_text)
}

/// PDF strings are UTF-16BE with a BOM, otherwise UTF-8 or PDFDocEncoding.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // Latin-1 fallback: each byte is its own code point
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{dictionary, Stream};

    fn build_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
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

    #[test]
    fn test_content_stream_walk_keeps_page_order() {
        let pdf = build_pdf(&["First page text", "Second page text"]);
        let text = extract_via_content_streams(&pdf).unwrap();

        let first = text.find("First page text").expect("page 1 text");
        let second = text.find("Second page text").expect("page 2 text");
        assert!(first < second);
    }

    #[test]
    fn test_garbage_bytes_do_not_panic() {
        let extractor = TextLayerExtractor::new();
        let result = extractor.extract_bytes(b"definitely not a pdf");
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_or_empty_swallows_failure() {
        let doc = Document::new("broken.pdf", b"%PDF-1.4 truncated".to_vec());
        assert_eq!(TextLayerExtractor::new().extract_or_empty(&doc), "");
    }

    #[test]
    fn test_decode_utf16_with_bom() {
        let bytes = [0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        assert_eq!(decode_pdf_string(&bytes), "Hi");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        assert_eq!(decode_pdf_string(&[0x43, 0x61, 0x66, 0xE9]), "Café");
    }
}
