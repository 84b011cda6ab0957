use std::sync::Arc;

use portal::storage::{
    DocumentRecord, DocumentStore, FeedbackStore, IngestStatus, JsonDocumentStore,
    JsonTableConfig, JsonTableStorage, NewUserRecord, RecordStore, StorageManager,
    StoragesStatus, UserRole, UserStore,
};
use serde_json::json;
use tempfile::TempDir;

fn temp_data_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

fn table(dir: &TempDir, name: &str) -> JsonTableStorage {
    JsonTableStorage::new(JsonTableConfig {
        data_dir: dir.path().into(),
        table: name.to_string(),
    })
}

#[tokio::test]
async fn json_table_roundtrip_delete_and_reload() -> anyhow::Result<()> {
    let dir = temp_data_dir();

    let storage = table(&dir, "roundtrip");
    storage.initialize().await?;

    let first = storage
        .insert(json!({ "email": "a@example.com", "name": "A" }))
        .await?;
    let second = storage
        .insert(json!({ "email": "b@example.com", "name": "B" }))
        .await?;

    assert_eq!(first["id"], json!(1));
    assert_eq!(second["id"], json!(2));
    assert!(first["created_at"].is_string());

    let found = storage
        .find_by_field("email", &json!("b@example.com"))
        .await?;
    assert_eq!(found.unwrap()["id"], json!(2));
    assert!(
        storage
            .find_by_field("email", &json!("missing@example.com"))
            .await?
            .is_none()
    );

    storage.sync_if_dirty().await?;

    let reopened = table(&dir, "roundtrip");
    reopened.initialize().await?;
    assert!(reopened.get_by_id(1).await?.is_some());
    assert!(reopened.get_by_id(2).await?.is_some());

    // new inserts continue the id sequence after a reload
    let third = reopened.insert(json!({ "email": "c@example.com" })).await?;
    assert_eq!(third["id"], json!(3));

    assert!(reopened.delete(1).await?);
    assert!(!reopened.delete(1).await?);
    reopened.sync_if_dirty().await?;
    assert!(reopened.get_by_id(1).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn json_table_orders_by_field_with_id_tiebreak() -> anyhow::Result<()> {
    let dir = temp_data_dir();
    let storage = table(&dir, "ordering");
    storage.initialize().await?;

    storage
        .insert(json!({ "label": "mid", "created_at": "2026-02-01T00:00:00Z" }))
        .await?;
    storage
        .insert(json!({ "label": "old", "created_at": "2026-01-01T00:00:00Z" }))
        .await?;
    storage
        .insert(json!({ "label": "new", "created_at": "2026-03-01T00:00:00Z" }))
        .await?;
    storage
        .insert(json!({ "label": "tie", "created_at": "2026-03-01T00:00:00Z" }))
        .await?;

    let descending = storage.list_ordered_by("created_at", true).await?;
    let labels: Vec<&str> = descending
        .iter()
        .map(|record| record["label"].as_str().unwrap())
        .collect();
    // ties break on id, descending with the rest of the ordering
    assert_eq!(labels, vec!["tie", "new", "mid", "old"]);

    let ascending = storage.list_ordered_by("created_at", false).await?;
    let labels: Vec<&str> = ascending
        .iter()
        .map(|record| record["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["old", "mid", "new", "tie"]);

    Ok(())
}

#[tokio::test]
async fn user_store_typed_roundtrip() -> anyhow::Result<()> {
    let dir = temp_data_dir();
    let users_table = Arc::new(table(&dir, "users"));
    users_table.initialize().await?;
    let users = UserStore::new(users_table);

    let created = users
        .create(NewUserRecord {
            email: "student@example.com".to_string(),
            username: "student1".to_string(),
            full_name: "Student One".to_string(),
            password: "salt$digest".to_string(),
            role: UserRole::Student,
            is_active: true,
        })
        .await?;
    users
        .create(NewUserRecord {
            email: "prof@example.com".to_string(),
            username: "prof1".to_string(),
            full_name: "Professor One".to_string(),
            password: "salt$digest".to_string(),
            role: UserRole::Faculty,
            is_active: true,
        })
        .await?;

    assert_eq!(created.id, 1);
    assert_eq!(created.role, UserRole::Student);

    let by_email = users.find_by_email("student@example.com").await?;
    assert_eq!(by_email.unwrap().username, "student1");

    let students = users.list_by_role(UserRole::Student).await?;
    assert_eq!(students.len(), 1);
    let faculty = users.list_by_role(UserRole::Faculty).await?;
    assert_eq!(faculty.len(), 1);
    assert!(users.list_by_role(UserRole::Admin).await?.is_empty());

    assert!(users.delete(created.id).await?);
    assert!(users.get(created.id).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn feedback_store_lists_newest_first() -> anyhow::Result<()> {
    let dir = temp_data_dir();
    let feedback_table = Arc::new(table(&dir, "feedback"));
    feedback_table.initialize().await?;
    let feedback = FeedbackStore::new(feedback_table);

    let first = feedback.create("first message", 1).await?;
    let second = feedback.create("second message", 2).await?;
    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);

    let listed = feedback.list_newest_first().await?;
    assert_eq!(listed.len(), 2);
    // same-second timestamps fall back to id, newest insert first
    assert_eq!(listed[0].id, 2);
    assert_eq!(listed[1].id, 1);

    assert!(feedback.delete(1).await?);
    assert!(!feedback.delete(1).await?);
    assert_eq!(feedback.list_newest_first().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn storage_manager_initializes_and_flushes_everything() -> anyhow::Result<()> {
    let dir = temp_data_dir();
    let users_table = Arc::new(table(&dir, "users"));
    let documents = Arc::new(JsonDocumentStore::new(dir.path().into()));

    let mut manager = StorageManager::new();
    assert!(manager.is_empty());
    manager.register_record(users_table.clone());
    manager.register_documents(documents.clone());
    assert_eq!(manager.status(), StoragesStatus::Created);

    manager.initialize_all().await?;
    assert_eq!(manager.status(), StoragesStatus::Initialized);

    users_table.insert(json!({ "email": "a@example.com" })).await?;
    documents
        .upsert(document(
            "20260101_090000_seed",
            "2026-01-01T09:00:00Z",
            IngestStatus::Extracted,
        ))
        .await?;

    // finalize flushes dirty stores so a fresh process sees the data
    manager.finalize_all().await?;

    let reopened_table = table(&dir, "users");
    reopened_table.initialize().await?;
    assert!(reopened_table.get_by_id(1).await?.is_some());

    let reopened_documents = JsonDocumentStore::new(dir.path().into());
    reopened_documents.initialize().await?;
    assert!(reopened_documents.get("20260101_090000_seed").await?.is_some());

    Ok(())
}

fn document(id: &str, created_at: &str, status: IngestStatus) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        original_filename: format!("{id}.png"),
        stored_path: format!("/uploads/{id}.png"),
        text_path: match status {
            IngestStatus::Extracted => Some(format!("/texts/{id}.txt")),
            IngestStatus::Failed => None,
        },
        created_at: created_at.to_string(),
        status,
        error_msg: None,
    }
}

#[tokio::test]
async fn document_store_roundtrip_ordering_and_reload() -> anyhow::Result<()> {
    let dir = temp_data_dir();

    let store = JsonDocumentStore::new(dir.path().into());
    store.initialize().await?;

    store
        .upsert(document(
            "20260101_090000_b",
            "2026-01-01T09:00:00Z",
            IngestStatus::Extracted,
        ))
        .await?;
    store
        .upsert(document(
            "20260102_090000_a",
            "2026-01-02T09:00:00Z",
            IngestStatus::Extracted,
        ))
        .await?;
    store
        .upsert(document(
            "20260103_090000_broken",
            "2026-01-03T09:00:00Z",
            IngestStatus::Failed,
        ))
        .await?;

    let listed = store.list_extracted_newest_first().await?;
    let ids: Vec<&str> = listed.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, vec!["20260102_090000_a", "20260101_090000_b"]);

    let lexicographic = store.extracted_ids_lexicographic().await?;
    assert_eq!(
        lexicographic,
        vec!["20260101_090000_b", "20260102_090000_a"]
    );

    assert!(store.get("20260103_090000_broken").await?.is_some());
    assert!(store.get("nope").await?.is_none());

    store.sync_if_dirty().await?;

    let reopened = JsonDocumentStore::new(dir.path().into());
    reopened.initialize().await?;
    assert_eq!(reopened.list_extracted_newest_first().await?.len(), 2);

    Ok(())
}
