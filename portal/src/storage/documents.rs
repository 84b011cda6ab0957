use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering as AtomicOrdering},
    },
};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::StorageResult;
use super::io::{ensure_parent_dir, load_or_default, write_json_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    /// Text extraction completed; the document is visible in the catalog.
    Extracted,
    /// The raw upload is on disk but extraction failed; retained so the
    /// orphan is inspectable instead of silently stranded.
    Failed,
}

/// Explicit document metadata persisted alongside content. Replaces
/// enumerating the text store and deriving timestamps from file mtimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Storage stem: timestamp-prefixed original name without extension.
    pub id: String,
    pub original_filename: String,
    pub stored_path: String,
    pub text_path: Option<String>,
    /// ISO-8601, recorded at ingest time.
    pub created_at: String,
    pub status: IngestStatus,
    #[serde(default)]
    pub error_msg: Option<String>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn initialize(&self) -> StorageResult<()>;
    async fn finalize(&self) -> StorageResult<()>;

    async fn upsert(&self, record: DocumentRecord) -> StorageResult<()>;
    async fn get(&self, id: &str) -> StorageResult<Option<DocumentRecord>>;

    /// Extracted documents, newest first; ties break on id descending.
    async fn list_extracted_newest_first(&self) -> StorageResult<Vec<DocumentRecord>>;

    /// Ids of extracted documents in lexicographic order, the stable
    /// enumeration order for combined output.
    async fn extracted_ids_lexicographic(&self) -> StorageResult<Vec<String>>;

    async fn sync_if_dirty(&self) -> StorageResult<()>;
}

pub struct JsonDocumentStore {
    file_path: PathBuf,
    data: Arc<RwLock<HashMap<String, DocumentRecord>>>,
    dirty: AtomicBool,
}

impl JsonDocumentStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            file_path: data_dir.join("documents.json"),
            data: Arc::new(RwLock::new(HashMap::new())),
            dirty: AtomicBool::new(false),
        }
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn initialize(&self) -> StorageResult<()> {
        ensure_parent_dir(&self.file_path).await?;
        let data: HashMap<String, DocumentRecord> = load_or_default(&self.file_path).await?;
        *self.data.write().await = data;
        self.dirty.store(false, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn finalize(&self) -> StorageResult<()> {
        self.sync_if_dirty().await
    }

    async fn upsert(&self, record: DocumentRecord) -> StorageResult<()> {
        let mut guard = self.data.write().await;
        guard.insert(record.id.clone(), record);
        drop(guard);
        self.mark_dirty();
        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Option<DocumentRecord>> {
        let guard = self.data.read().await;
        Ok(guard.get(id).cloned())
    }

    async fn list_extracted_newest_first(&self) -> StorageResult<Vec<DocumentRecord>> {
        let guard = self.data.read().await;
        let mut records: Vec<DocumentRecord> = guard
            .values()
            .filter(|record| record.status == IngestStatus::Extracted)
            .cloned()
            .collect();

        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    async fn extracted_ids_lexicographic(&self) -> StorageResult<Vec<String>> {
        let guard = self.data.read().await;
        let mut ids: Vec<String> = guard
            .values()
            .filter(|record| record.status == IngestStatus::Extracted)
            .map(|record| record.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn sync_if_dirty(&self) -> StorageResult<()> {
        if !self.dirty.swap(false, AtomicOrdering::SeqCst) {
            return Ok(());
        }

        let snapshot = {
            let guard = self.data.read().await;
            guard.clone()
        };

        write_json_file(&self.file_path, &snapshot)
            .await
            .context("failed to write document metadata store")?;
        Ok(())
    }
}
