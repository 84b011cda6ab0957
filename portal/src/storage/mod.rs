use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub mod documents;
pub mod io;
pub mod json_table;
pub mod manager;
pub mod records;

pub use documents::{DocumentRecord, DocumentStore, IngestStatus, JsonDocumentStore};
pub use json_table::{JsonTableConfig, JsonTableStorage};
pub use manager::{StorageManager, StoragesStatus};
pub use records::{
    FeedbackRecord, FeedbackStore, NewUserRecord, UserRecord, UserRole, UserStore,
};

pub type StorageResult<T> = Result<T>;

/// The record-store primitives the rest of the service is written against.
/// Records are JSON objects; `insert` assigns an integer `id` and stamps
/// `created_at` when absent.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn initialize(&self) -> StorageResult<()>;
    async fn finalize(&self) -> StorageResult<()>;

    /// Insert a record, assigning its id. Returns the stored value.
    async fn insert(&self, record: Value) -> StorageResult<Value>;

    async fn get_by_id(&self, id: i64) -> StorageResult<Option<Value>>;

    /// First record whose `field` equals `value`, lowest id wins.
    async fn find_by_field(&self, field: &str, value: &Value) -> StorageResult<Option<Value>>;

    /// All records whose `field` equals `value`, ordered by id.
    async fn filter_by_field(&self, field: &str, value: &Value) -> StorageResult<Vec<Value>>;

    /// Remove a record; returns whether anything was deleted.
    async fn delete(&self, id: i64) -> StorageResult<bool>;

    /// All records ordered by `field`. Ties break on id so listings are
    /// deterministic.
    async fn list_ordered_by(&self, field: &str, descending: bool) -> StorageResult<Vec<Value>>;

    /// Flush dirty state to disk if needed.
    async fn sync_if_dirty(&self) -> StorageResult<()>;
}
