use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI64, Ordering as AtomicOrdering},
    },
};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::RecordStore;
use super::StorageResult;
use super::io::{ensure_parent_dir, load_or_default, write_json_file};

#[derive(Clone, Debug)]
pub struct JsonTableConfig {
    pub data_dir: PathBuf,
    pub table: String,
}

/// A JSON-file-backed record table with integer ids. All records live in
/// memory behind an RwLock; mutations mark the table dirty and
/// `sync_if_dirty` flushes the snapshot atomically.
pub struct JsonTableStorage {
    table: String,
    file_path: PathBuf,
    data: Arc<RwLock<BTreeMap<i64, Value>>>,
    next_id: AtomicI64,
    dirty: AtomicBool,
}

impl JsonTableStorage {
    pub fn new(config: JsonTableConfig) -> Self {
        let JsonTableConfig { data_dir, table } = config;
        let file_path = data_dir.join(format!("table_{}.json", table));

        Self {
            table,
            file_path,
            data: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: AtomicI64::new(1),
            dirty: AtomicBool::new(false),
        }
    }

    fn decorate_insert(&self, id: i64, value: Value) -> StorageResult<Value> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other);
                map
            }
        };

        map.insert("id".to_string(), Value::from(id));
        map.entry("created_at".to_string())
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        Ok(Value::Object(map))
    }
}

#[async_trait]
impl RecordStore for JsonTableStorage {
    async fn initialize(&self) -> StorageResult<()> {
        ensure_parent_dir(&self.file_path).await?;
        let raw: HashMap<String, Value> = load_or_default(&self.file_path).await?;

        let mut data = BTreeMap::new();
        for (key, value) in raw {
            let id: i64 = key
                .parse()
                .map_err(|_| anyhow!("invalid record id '{key}' in table {}", self.table))?;
            data.insert(id, value);
        }

        let max_id = data.keys().next_back().copied().unwrap_or(0);
        self.next_id.store(max_id + 1, AtomicOrdering::SeqCst);
        *self.data.write().await = data;
        self.dirty.store(false, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn finalize(&self) -> StorageResult<()> {
        self.sync_if_dirty().await
    }

    async fn insert(&self, record: Value) -> StorageResult<Value> {
        let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
        let decorated = self
            .decorate_insert(id, record)
            .with_context(|| format!("invalid record for table {}", self.table))?;

        let mut guard = self.data.write().await;
        guard.insert(id, decorated.clone());
        self.dirty.store(true, AtomicOrdering::SeqCst);
        Ok(decorated)
    }

    async fn get_by_id(&self, id: i64) -> StorageResult<Option<Value>> {
        let guard = self.data.read().await;
        Ok(guard.get(&id).cloned())
    }

    async fn find_by_field(&self, field: &str, value: &Value) -> StorageResult<Option<Value>> {
        let guard = self.data.read().await;
        Ok(guard
            .values()
            .find(|record| record.get(field) == Some(value))
            .cloned())
    }

    async fn filter_by_field(&self, field: &str, value: &Value) -> StorageResult<Vec<Value>> {
        let guard = self.data.read().await;
        Ok(guard
            .values()
            .filter(|record| record.get(field) == Some(value))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64) -> StorageResult<bool> {
        let mut guard = self.data.write().await;
        let removed = guard.remove(&id).is_some();
        if removed {
            self.dirty.store(true, AtomicOrdering::SeqCst);
        }
        Ok(removed)
    }

    async fn list_ordered_by(&self, field: &str, descending: bool) -> StorageResult<Vec<Value>> {
        let guard = self.data.read().await;
        let mut records: Vec<(i64, Value)> =
            guard.iter().map(|(id, v)| (*id, v.clone())).collect();

        records.sort_by(|(id_a, a), (id_b, b)| {
            let ordering = compare_field(a.get(field), b.get(field)).then(id_a.cmp(id_b));
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        Ok(records.into_iter().map(|(_, v)| v).collect())
    }

    async fn sync_if_dirty(&self) -> StorageResult<()> {
        if !self.dirty.swap(false, AtomicOrdering::SeqCst) {
            return Ok(());
        }

        let snapshot: HashMap<String, Value> = {
            let guard = self.data.read().await;
            guard
                .iter()
                .map(|(id, v)| (id.to_string(), v.clone()))
                .collect()
        };

        write_json_file(&self.file_path, &snapshot)
            .await
            .with_context(|| format!("failed to write table {}", self.table))?;
        Ok(())
    }
}

/// Numbers compare numerically, everything else by string form; absent
/// fields sort first.
fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            }
        }
        (Some(x), Some(y)) => field_string(x).cmp(&field_string(y)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn field_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
