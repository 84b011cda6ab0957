use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::storage::DocumentStore;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Document not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub created_at: String,
    pub path: String,
}

/// Read side of the document store: listing, retrieval, and combined
/// output over previously ingested documents.
pub struct DocumentCatalog {
    documents: Arc<dyn DocumentStore>,
}

impl DocumentCatalog {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Extracted documents newest-first, straight from the metadata
    /// records; no mtime inspection, no directory globbing.
    pub async fn list(&self) -> anyhow::Result<Vec<DocumentSummary>> {
        let records = self.documents.list_extracted_newest_first().await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let path = record.text_path.clone().unwrap_or_default();
                DocumentSummary {
                    id: record.id,
                    filename: record.original_filename,
                    created_at: record.created_at,
                    path,
                }
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<String, CatalogError> {
        let record = self
            .documents
            .get(id)
            .await
            .map_err(CatalogError::Internal)?
            .ok_or(CatalogError::NotFound)?;

        let Some(text_path) = record.text_path else {
            return Err(CatalogError::NotFound);
        };
        match tokio::fs::read_to_string(&text_path).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(id, path = %text_path, "metadata points at a missing text file");
                Err(CatalogError::NotFound)
            }
            Err(err) => Err(CatalogError::Internal(err.into())),
        }
    }

    /// Every extracted document's text, each prefixed with a separator
    /// naming its id, in lexicographic id order.
    pub async fn combine(&self) -> anyhow::Result<String> {
        let ids = self.documents.extracted_ids_lexicographic().await?;

        let mut combined = String::new();
        for id in ids {
            match self.get(&id).await {
                Ok(content) => {
                    combined.push_str(&format!("\n\n--- Document: {id} ---\n\n"));
                    combined.push_str(&content);
                    combined.push('\n');
                }
                // A record can point at a file that vanished mid-read;
                // skip it rather than failing the whole combination.
                Err(CatalogError::NotFound) => continue,
                Err(CatalogError::Internal(err)) => return Err(err),
            }
        }

        Ok(combined)
    }
}
