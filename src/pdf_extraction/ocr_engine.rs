// OCR fallback: rasterize with pdftoppm, recognize with tesseract
//
// The expensive path. Only runs when the text layer was classified garbled
// or could not be read at all.

use image::ImageFormat;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Instant;
use tracing::{debug, info};

use super::DocumentExtractor;
use crate::config::OcrConfig;
use crate::error::ExtractionError;
use crate::types::{Document, ExtractionMethod};

const PAGE_PREFIX: &str = "page";

pub struct OcrEngine {
    config: OcrConfig,
}

impl OcrEngine {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// True when both pdftoppm and tesseract can be launched.
    pub fn is_available(&self) -> bool {
        command_available(&self.config.pdftoppm_path, "-v")
            && command_available(&self.config.tesseract_path, "--version")
    }

    /// Rasterize every page and OCR it; pages are joined with a newline.
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let workdir = tempfile::tempdir().map_err(|source| ExtractionError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        let pdf_path = workdir.path().join("input.pdf");
        fs::write(&pdf_path, bytes).map_err(|source| ExtractionError::Io {
            path: pdf_path.clone(),
            source,
        })?;

        let pages = self.rasterize(&pdf_path, workdir.path())?;
        if pages.is_empty() {
            return Err(ExtractionError::Empty("pdftoppm"));
        }

        let mut page_texts = Vec::with_capacity(pages.len());
        for page in &pages {
            if self.config.grayscale {
                to_grayscale(page)?;
            }
            page_texts.push(self.recognize(page)?);
        }

        Ok(page_texts.join("\n").trim().to_string())
    }

    fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let prefix = out_dir.join(PAGE_PREFIX);
        let dpi = self.config.dpi.to_string();
        run_tool(
            &self.config.pdftoppm_path,
            Command::new(&self.config.pdftoppm_path)
                .args(["-r", dpi.as_str(), "-png"])
                .arg(pdf_path)
                .arg(&prefix),
        )?;

        let entries = fs::read_dir(out_dir).map_err(|source| ExtractionError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let mut pages: Vec<(u32, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                page_number(&name).map(|n| (n, entry.path()))
            })
            .collect();
        pages.sort_by_key(|(n, _)| *n);

        debug!("pdftoppm rendered {} pages at {} dpi", pages.len(), self.config.dpi);
        Ok(pages.into_iter().map(|(_, path)| path).collect())
    }

    fn recognize(&self, image_path: &Path) -> Result<String, ExtractionError> {
        let output = run_tool(
            &self.config.tesseract_path,
            Command::new(&self.config.tesseract_path)
                .arg(image_path)
                .arg("stdout")
                .args(["-l", self.config.language.as_str()]),
        )?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DocumentExtractor for OcrEngine {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Ocr
    }

    fn extract(&self, document: &Document) -> Result<String, ExtractionError> {
        let start = Instant::now();
        let text = self.extract_bytes(&document.bytes)?;
        info!(
            "OCR: {} -> {} chars in {}ms",
            document.name,
            text.len(),
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

/// pdftoppm names pages `page-1.png` or `page-01.png` depending on page count.
fn page_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

fn to_grayscale(path: &Path) -> Result<(), ExtractionError> {
    let img = image::open(path).map_err(|e| ExtractionError::Parse(format!("{}: {}", path.display(), e)))?;
    img.grayscale()
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| ExtractionError::Parse(format!("{}: {}", path.display(), e)))
}

fn run_tool(tool: &str, command: &mut Command) -> Result<Output, ExtractionError> {
    let output = command.output().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => ExtractionError::ToolMissing {
            tool: tool.to_string(),
            reason: e.to_string(),
        },
        _ => ExtractionError::Io {
            path: PathBuf::from(tool),
            source: e,
        },
    })?;

    if !output.status.success() {
        return Err(ExtractionError::Tool {
            tool: tool.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

fn command_available(tool: &str, version_flag: &str) -> bool {
    Command::new(tool)
        .arg(version_flag)
        .output()
        .map(|_| true)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_tools() -> OcrConfig {
        OcrConfig {
            pdftoppm_path: "/nonexistent/pdftoppm".to_string(),
            tesseract_path: "/nonexistent/tesseract".to_string(),
            ..OcrConfig::default()
        }
    }

    #[test]
    fn test_page_number_parsing() {
        assert_eq!(page_number("page-1.png"), Some(1));
        assert_eq!(page_number("page-07.png"), Some(7));
        assert_eq!(page_number("page-12.png"), Some(12));
        assert_eq!(page_number("input.pdf"), None);
        assert_eq!(page_number("page-x.png"), None);
    }

    #[test]
    fn test_pages_sort_numerically() {
        let mut names = vec!["page-10.png", "page-2.png", "page-1.png"];
        names.sort_by_key(|n| page_number(n));
        assert_eq!(names, vec!["page-1.png", "page-2.png", "page-10.png"]);
    }

    #[test]
    fn test_missing_tools_are_reported() {
        let engine = OcrEngine::new(missing_tools());
        assert!(!engine.is_available());

        let err = engine.extract_bytes(b"%PDF-1.4").unwrap_err();
        assert!(
            matches!(err, ExtractionError::ToolMissing { ref tool, .. } if tool == "/nonexistent/pdftoppm"),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_grayscale_rewrites_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page-1.png");
        let rgb = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]));
        rgb.save(&path).unwrap();

        to_grayscale(&path).unwrap();

        let reloaded = image::open(&path).unwrap();
        assert_eq!(reloaded.color(), image::ColorType::L8);
    }
}
