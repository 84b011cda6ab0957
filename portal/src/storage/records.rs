use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{JsonTableStorage, RecordStore, StorageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Faculty,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Faculty => "faculty",
            UserRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: String,
    /// Salted hash, never the plain credential.
    pub password: String,
    #[serde(rename = "user_type")]
    pub role: UserRole,
    pub created_at: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUserRecord {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub password: String,
    #[serde(rename = "user_type")]
    pub role: UserRole,
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub message: String,
    pub user_id: i64,
    pub created_at: String,
}

/// Typed view over the user table.
pub struct UserStore {
    table: Arc<JsonTableStorage>,
}

impl UserStore {
    pub fn new(table: Arc<JsonTableStorage>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> Arc<JsonTableStorage> {
        self.table.clone()
    }

    pub async fn create(&self, new_user: NewUserRecord) -> StorageResult<UserRecord> {
        let value = serde_json::to_value(&new_user).context("failed to encode user record")?;
        let stored = self.table.insert(value).await?;
        decode(stored)
    }

    pub async fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>> {
        let found = self.table.find_by_field("email", &json!(email)).await?;
        found.map(decode).transpose()
    }

    pub async fn get(&self, id: i64) -> StorageResult<Option<UserRecord>> {
        let found = self.table.get_by_id(id).await?;
        found.map(decode).transpose()
    }

    pub async fn list_by_role(&self, role: UserRole) -> StorageResult<Vec<UserRecord>> {
        let records = self
            .table
            .filter_by_field("user_type", &json!(role.as_str()))
            .await?;
        records.into_iter().map(decode).collect()
    }

    pub async fn delete(&self, id: i64) -> StorageResult<bool> {
        let removed = self.table.delete(id).await?;
        if removed {
            self.table.sync_if_dirty().await?;
        }
        Ok(removed)
    }

    pub async fn persist(&self) -> StorageResult<()> {
        self.table.sync_if_dirty().await
    }
}

/// Typed view over the feedback table.
pub struct FeedbackStore {
    table: Arc<JsonTableStorage>,
}

impl FeedbackStore {
    pub fn new(table: Arc<JsonTableStorage>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> Arc<JsonTableStorage> {
        self.table.clone()
    }

    pub async fn create(&self, message: &str, user_id: i64) -> StorageResult<FeedbackRecord> {
        let stored = self
            .table
            .insert(json!({ "message": message, "user_id": user_id }))
            .await?;
        let record = decode(stored)?;
        self.table.sync_if_dirty().await?;
        Ok(record)
    }

    pub async fn get(&self, id: i64) -> StorageResult<Option<FeedbackRecord>> {
        let found = self.table.get_by_id(id).await?;
        found.map(decode).transpose()
    }

    pub async fn list_newest_first(&self) -> StorageResult<Vec<FeedbackRecord>> {
        let records = self.table.list_ordered_by("created_at", true).await?;
        records.into_iter().map(decode).collect()
    }

    pub async fn delete(&self, id: i64) -> StorageResult<bool> {
        let removed = self.table.delete(id).await?;
        if removed {
            self.table.sync_if_dirty().await?;
        }
        Ok(removed)
    }
}

fn decode<T>(value: Value) -> StorageResult<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(value).context("stored record has an unexpected shape")
}
