use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, anyhow};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::storage::{DocumentRecord, DocumentStore, IngestStatus, io::write_bytes_atomic};

use super::normalize::normalize;
use super::ocr::{DocumentTextExtractor, OcrError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedDocument {
    pub filename: String,
    pub file_path: String,
    pub text_filename: String,
    pub text_path: String,
}

/// Orchestrates one upload: persist raw bytes, extract text, normalize,
/// persist the text, and record metadata. Extractions run under a bounded
/// number of permits so OCR subprocesses cannot pile up without limit.
pub struct IngestionPipeline {
    upload_dir: PathBuf,
    text_dir: PathBuf,
    extractor: DocumentTextExtractor,
    documents: Arc<dyn DocumentStore>,
    extraction_permits: Arc<Semaphore>,
}

impl IngestionPipeline {
    pub async fn new(
        upload_dir: PathBuf,
        text_dir: PathBuf,
        extractor: DocumentTextExtractor,
        documents: Arc<dyn DocumentStore>,
        max_concurrent_extractions: usize,
    ) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&upload_dir)
            .await
            .with_context(|| format!("failed to create upload dir {}", upload_dir.display()))?;
        tokio::fs::create_dir_all(&text_dir)
            .await
            .with_context(|| format!("failed to create text dir {}", text_dir.display()))?;

        Ok(Self {
            upload_dir,
            text_dir,
            extractor,
            documents,
            extraction_permits: Arc::new(Semaphore::new(max_concurrent_extractions.max(1))),
        })
    }

    pub async fn ingest(
        &self,
        bytes: Vec<u8>,
        original_filename: &str,
    ) -> Result<UploadedDocument, IngestError> {
        let original = sanitize_filename(original_filename)?;
        let stored_name = self.unique_stored_name(&original);
        let stem = text_stem(&stored_name);

        let raw_path = self.upload_dir.join(&stored_name);
        write_bytes_atomic(&raw_path, &bytes)
            .await
            .context("failed to persist uploaded file")?;

        let created_at = Utc::now().to_rfc3339();

        let extraction = {
            let _permit = self
                .extraction_permits
                .acquire()
                .await
                .map_err(|_| anyhow!("extraction pool closed"))?;
            self.extractor.extract(&bytes, &original).await
        };

        let raw_text = match extraction {
            Ok(extraction) => {
                if !extraction.page_failures.is_empty() {
                    warn!(
                        filename = %stored_name,
                        failed_pages = extraction.page_failures.len(),
                        "document ingested with skipped pages"
                    );
                }
                extraction.text
            }
            Err(err) => {
                self.record_failure(&stem, &original, &raw_path, &created_at, &err)
                    .await;
                return Err(err.into());
            }
        };

        let cleaned = normalize(&raw_text);

        let text_filename = format!("{stem}.txt");
        let text_path = self.text_dir.join(&text_filename);
        write_bytes_atomic(&text_path, cleaned.as_bytes())
            .await
            .context("failed to persist extracted text")?;

        self.documents
            .upsert(DocumentRecord {
                id: stem,
                original_filename: original,
                stored_path: raw_path.display().to_string(),
                text_path: Some(text_path.display().to_string()),
                created_at,
                status: IngestStatus::Extracted,
                error_msg: None,
            })
            .await
            .context("failed to record document metadata")?;
        self.documents
            .sync_if_dirty()
            .await
            .context("failed to persist document metadata")?;

        info!(filename = %stored_name, "document ingested");

        Ok(UploadedDocument {
            filename: stored_name,
            file_path: raw_path.display().to_string(),
            text_filename,
            text_path: text_path.display().to_string(),
        })
    }

    /// The raw file stays on disk; the metadata record carries the failure
    /// so the orphan is visible instead of silently stranded.
    async fn record_failure(
        &self,
        stem: &str,
        original: &str,
        raw_path: &Path,
        created_at: &str,
        err: &OcrError,
    ) {
        let record = DocumentRecord {
            id: stem.to_string(),
            original_filename: original.to_string(),
            stored_path: raw_path.display().to_string(),
            text_path: None,
            created_at: created_at.to_string(),
            status: IngestStatus::Failed,
            error_msg: Some(err.to_string()),
        };

        if let Err(store_err) = self.documents.upsert(record).await {
            warn!(error = %store_err, "failed to record ingestion failure");
            return;
        }
        if let Err(store_err) = self.documents.sync_if_dirty().await {
            warn!(error = %store_err, "failed to persist ingestion failure record");
        }
    }

    /// Timestamped storage name; a `_<n>` counter uniquifies collisions
    /// within the same second (or across extensions sharing a stem).
    fn unique_stored_name(&self, original: &str) -> String {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let base = format!("{timestamp}_{original}");

        if self.is_free(&base) {
            return base;
        }

        let (stem, ext) = match Path::new(&base).file_stem().and_then(|s| s.to_str()) {
            Some(stem) => {
                let ext = Path::new(&base)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("");
                (stem.to_string(), ext.to_string())
            }
            None => (base.clone(), String::new()),
        };

        let mut counter = 1usize;
        loop {
            let candidate = if ext.is_empty() {
                format!("{stem}_{counter}")
            } else {
                format!("{stem}_{counter}.{ext}")
            };

            if self.is_free(&candidate) {
                return candidate;
            }

            counter += 1;
        }
    }

    /// Free means neither the raw name nor the derived text name is taken.
    fn is_free(&self, stored_name: &str) -> bool {
        let raw_taken = self.upload_dir.join(stored_name).exists();
        let text_taken = self
            .text_dir
            .join(format!("{}.txt", text_stem(stored_name)))
            .exists();
        !raw_taken && !text_taken
    }
}

fn sanitize_filename(raw: &str) -> Result<String, IngestError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IngestError::InvalidFilename(
            "filename cannot be empty".to_string(),
        ));
    }

    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return Err(IngestError::InvalidFilename(format!(
            "'{trimmed}' contains path segments"
        )));
    }

    Ok(trimmed.to_string())
}

/// Storage name without its final extension; doubles as the document id
/// and the text-file stem.
fn text_stem(stored_name: &str) -> String {
    Path::new(stored_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(stored_name)
        .to_string()
}
