use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{process::Command, time};
use tracing::warn;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("ocr engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("page rendering failed: {0}")]
    RenderFailed(String),

    #[error("text recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("{command} timed out after {seconds}s")]
    Timeout { command: &'static str, seconds: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A page that failed recognition; the document call still succeeds.
#[derive(Debug, Clone)]
pub struct PageFailure {
    pub page: usize,
    pub message: String,
}

#[derive(Debug)]
pub struct Extraction {
    pub text: String,
    pub page_failures: Vec<PageFailure>,
}

/// Text recognition over a single image file.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image_path: &Path) -> Result<String, OcrError>;
}

/// Tesseract via its command-line binary, language pinned by config.
pub struct TesseractEngine {
    language: String,
    timeout: Duration,
}

impl TesseractEngine {
    pub fn new(language: String, timeout: Duration) -> Self {
        Self { language, timeout }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .kill_on_drop(true)
            .output();

        let output = time::timeout(self.timeout, output)
            .await
            .map_err(|_| OcrError::Timeout {
                command: "tesseract",
                seconds: self.timeout.as_secs(),
            })?;

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::RecognitionFailed(format!(
                    "tesseract failed: {}",
                    stderr.trim()
                )))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::EngineUnavailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(err) => Err(OcrError::Io(err)),
        }
    }
}

/// Renders every page of a document to an image file in `out_dir`,
/// returning the image paths in page order.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_pages(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, OcrError>;
}

/// pdftoppm (poppler) rendering at a fixed resolution.
pub struct PopplerRenderer {
    dpi: u32,
    timeout: Duration,
}

impl PopplerRenderer {
    pub fn new(dpi: u32, timeout: Duration) -> Self {
        Self { dpi, timeout }
    }
}

#[async_trait]
impl PageRenderer for PopplerRenderer {
    async fn render_pages(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
        let prefix = out_dir.join("page");

        let status = Command::new("pdftoppm")
            .args(["-png", "-r", &self.dpi.to_string()])
            .arg(pdf_path)
            .arg(&prefix)
            .kill_on_drop(true)
            .status();

        let status = time::timeout(self.timeout, status)
            .await
            .map_err(|_| OcrError::Timeout {
                command: "pdftoppm",
                seconds: self.timeout.as_secs(),
            })?;

        match status {
            Ok(status) if status.success() => collect_page_images(out_dir).await,
            Ok(_) => Err(OcrError::RenderFailed(
                "pdftoppm failed to convert the document".to_string(),
            )),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::EngineUnavailable(
                    "pdftoppm not found (install poppler-utils)".to_string(),
                ))
            }
            Err(err) => Err(OcrError::Io(err)),
        }
    }
}

/// pdftoppm names output `page-1.png`, `page-01.png`, ... depending on the
/// page count; collect and order by the parsed page number.
async fn collect_page_images(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    let mut pages: Vec<(u32, PathBuf)> = Vec::new();

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let number = name
            .strip_prefix("page-")
            .and_then(|rest| rest.strip_suffix(".png"))
            .and_then(|digits| digits.parse::<u32>().ok());
        if let Some(number) = number {
            pages.push((number, path));
        }
    }

    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// Converts an uploaded binary into raw text, page-aware for documents.
pub struct DocumentTextExtractor {
    engine: Arc<dyn OcrEngine>,
    renderer: Arc<dyn PageRenderer>,
}

impl DocumentTextExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, renderer: Arc<dyn PageRenderer>) -> Self {
        Self { engine, renderer }
    }

    /// Dispatch on the filename extension: `.pdf` runs the page-rendering
    /// path, anything else is treated as a single raster image.
    pub async fn extract(&self, bytes: &[u8], filename: &str) -> Result<Extraction, OcrError> {
        if has_pdf_extension(filename) {
            self.extract_document(bytes).await
        } else {
            self.extract_image(bytes).await
        }
    }

    async fn extract_document(&self, bytes: &[u8]) -> Result<Extraction, OcrError> {
        let is_pdf = infer::get(bytes).is_some_and(|kind| kind.mime_type() == "application/pdf");
        if !is_pdf {
            return Err(OcrError::UnsupportedFormat(
                "payload is not a valid PDF document".to_string(),
            ));
        }

        let scratch = tempfile::tempdir()?;
        let pdf_path = scratch.path().join("document.pdf");
        tokio::fs::write(&pdf_path, bytes).await?;

        let render_dir = scratch.path().join("pages");
        tokio::fs::create_dir_all(&render_dir).await?;

        let pages = self.renderer.render_pages(&pdf_path, &render_dir).await?;
        if pages.is_empty() {
            return Err(OcrError::RenderFailed(
                "document produced no renderable pages".to_string(),
            ));
        }

        let mut text = String::new();
        let mut page_failures = Vec::new();

        for (index, image_path) in pages.iter().enumerate() {
            let page_number = index + 1;
            match self.engine.recognize(image_path).await {
                Ok(page_text) => {
                    text.push_str(&format!("\n\n--- Page {page_number} ---\n\n"));
                    text.push_str(&page_text);
                }
                Err(err) => {
                    warn!(page = page_number, error = %err, "skipping page after recognition failure");
                    page_failures.push(PageFailure {
                        page: page_number,
                        message: err.to_string(),
                    });
                }
            }
        }

        Ok(Extraction {
            text,
            page_failures,
        })
    }

    async fn extract_image(&self, bytes: &[u8]) -> Result<Extraction, OcrError> {
        let kind = infer::get(bytes).ok_or_else(|| {
            OcrError::UnsupportedFormat("payload is not a recognizable image".to_string())
        })?;
        if !kind.mime_type().starts_with("image/") {
            return Err(OcrError::UnsupportedFormat(format!(
                "cannot run text recognition on {}",
                kind.mime_type()
            )));
        }

        let scratch = tempfile::tempdir()?;
        let image_path = scratch.path().join(format!("upload.{}", kind.extension()));
        tokio::fs::write(&image_path, bytes).await?;

        let text = self.engine.recognize(&image_path).await?;
        Ok(Extraction {
            text,
            page_failures: Vec::new(),
        })
    }
}

pub fn has_pdf_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
