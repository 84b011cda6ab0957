use std::sync::Arc;

use super::{DocumentStore, RecordStore, StorageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoragesStatus {
    #[default]
    Created,
    Initialized,
}

enum ManagedStorage {
    Record(Arc<dyn RecordStore>),
    Document(Arc<dyn DocumentStore>),
}

impl ManagedStorage {
    async fn initialize(&self) -> StorageResult<()> {
        match self {
            ManagedStorage::Record(storage) => storage.initialize().await,
            ManagedStorage::Document(storage) => storage.initialize().await,
        }
    }

    async fn finalize(&self) -> StorageResult<()> {
        match self {
            ManagedStorage::Record(storage) => storage.finalize().await,
            ManagedStorage::Document(storage) => storage.finalize().await,
        }
    }
}

/// sequentially initializes registered backends to avoid deadlocks
pub struct StorageManager {
    status: StoragesStatus,
    storages: Vec<ManagedStorage>,
}

impl StorageManager {
    pub fn new() -> Self {
        Self {
            status: StoragesStatus::Created,
            storages: Vec::new(),
        }
    }

    pub fn status(&self) -> StoragesStatus {
        self.status
    }

    pub fn register_record<T>(&mut self, storage: Arc<T>)
    where
        T: RecordStore + 'static,
    {
        let storage: Arc<dyn RecordStore> = storage;
        self.storages.push(ManagedStorage::Record(storage));
    }

    pub fn register_documents<T>(&mut self, storage: Arc<T>)
    where
        T: DocumentStore + 'static,
    {
        let storage: Arc<dyn DocumentStore> = storage;
        self.storages.push(ManagedStorage::Document(storage));
    }

    pub fn is_empty(&self) -> bool {
        self.storages.is_empty()
    }

    pub async fn initialize_all(&mut self) -> StorageResult<()> {
        if self.status == StoragesStatus::Initialized {
            return Ok(());
        }

        for storage in &self.storages {
            storage.initialize().await?;
        }

        self.status = StoragesStatus::Initialized;
        Ok(())
    }

    pub async fn finalize_all(&self) -> StorageResult<()> {
        for storage in &self.storages {
            storage.finalize().await?;
        }
        Ok(())
    }
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}
