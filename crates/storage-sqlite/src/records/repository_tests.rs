use std::time::Duration;

use futures::StreamExt;
use labdash_core::errors::{Error, StoreError};
use labdash_core::records::{
    ChangeKind, FieldCondition, Record, RecordStoreTrait, WatchedCollection,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use super::SqliteRecordStore;
use crate::open_record_store;

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn open_store() -> (TempDir, SqliteRecordStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db").join("labdash.db");
    let store = open_record_store(path.to_str().unwrap(), 16).unwrap();
    (dir, store)
}

async fn seed_projects(store: &SqliteRecordStore) {
    for (id, status, branch) in [
        ("p1", "pending", "b1"),
        ("p2", "completed", "b1"),
        ("p3", "completed", "b2"),
    ] {
        store
            .insert(
                WatchedCollection::Projects,
                record(json!({
                    "id": id,
                    "name": format!("Project {}", id),
                    "test_type": "emc",
                    "client_id": "c1",
                    "branch_id": branch,
                    "status": status,
                })),
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_insert_then_read_all() {
    let (_dir, store) = open_store();
    seed_projects(&store).await;

    let set = store.read_all(WatchedCollection::Projects).await.unwrap();
    assert_eq!(set.collection, WatchedCollection::Projects);
    assert_eq!(set.len(), 3);
    let ids: Vec<&str> = set.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);
    assert!(set.records[0].contains_key("created_at"));

    let other = store.read_all(WatchedCollection::Clients).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn test_insert_assigns_id_when_missing() {
    let (_dir, store) = open_store();
    let inserted = store
        .insert(
            WatchedCollection::Branches,
            record(json!({"name": "North Lab", "location": "Oslo"})),
        )
        .await
        .unwrap();

    let id = inserted["id"].as_str().unwrap();
    assert!(!id.is_empty());
    let fetched = store.get(WatchedCollection::Branches, id).unwrap();
    assert_eq!(fetched["name"], json!("North Lab"));
}

#[tokio::test]
async fn test_insert_rejects_invalid_record() {
    let (_dir, store) = open_store();
    let result = store
        .insert(WatchedCollection::Branches, record(json!({"location": "Oslo"})))
        .await;
    assert!(matches!(result, Err(Error::InvalidRecord(_))));
    assert!(store
        .read_all(WatchedCollection::Branches)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_read_filtered_pushes_down_equality() {
    let (_dir, store) = open_store();
    seed_projects(&store).await;

    let conditions = vec![
        FieldCondition::equals("branch_id", "b1"),
        FieldCondition::equals("status", "completed"),
    ];
    let set = store
        .read_filtered(WatchedCollection::Projects, &conditions)
        .await
        .unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.records[0]["id"], json!("p2"));

    let none = store
        .read_filtered(
            WatchedCollection::Projects,
            &[FieldCondition::equals("branch_id", "b9")],
        )
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_update_keeps_created_at() {
    let (_dir, store) = open_store();
    seed_projects(&store).await;
    let before = store.get(WatchedCollection::Projects, "p1").unwrap();

    let updated = store
        .update(
            WatchedCollection::Projects,
            "p1",
            record(json!({
                "name": "Project p1",
                "test_type": "emc",
                "client_id": "c1",
                "branch_id": "b1",
                "status": "completed",
            })),
        )
        .await
        .unwrap();

    assert_eq!(updated["status"], json!("completed"));
    assert_eq!(updated["created_at"], before["created_at"]);
    let fetched = store.get(WatchedCollection::Projects, "p1").unwrap();
    assert_eq!(fetched["status"], json!("completed"));
}

#[tokio::test]
async fn test_update_and_delete_missing_record_are_not_found() {
    let (_dir, store) = open_store();
    let update = store
        .update(
            WatchedCollection::Clients,
            "nope",
            record(json!({"name": "Acme"})),
        )
        .await;
    assert!(matches!(update, Err(Error::Store(StoreError::NotFound(_)))));

    let delete = store.delete(WatchedCollection::Clients, "nope").await;
    assert!(matches!(delete, Err(Error::Store(StoreError::NotFound(_)))));
}

#[tokio::test]
async fn test_each_write_publishes_one_matching_event() {
    let (_dir, store) = open_store();
    let mut channel = store
        .open_change_channel(WatchedCollection::Clients)
        .await
        .unwrap();

    let inserted = store
        .insert(WatchedCollection::Clients, record(json!({"name": "Acme"})))
        .await
        .unwrap();
    let id = inserted["id"].as_str().unwrap().to_string();
    store
        .update(
            WatchedCollection::Clients,
            &id,
            record(json!({"name": "Acme Corp"})),
        )
        .await
        .unwrap();
    store.delete(WatchedCollection::Clients, &id).await.unwrap();

    let mut kinds = Vec::new();
    for _ in 0..3 {
        let event = tokio::time::timeout(Duration::from_secs(1), channel.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(event.collection, WatchedCollection::Clients);
        kinds.push(event.kind);
    }
    assert_eq!(
        kinds,
        vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]
    );

    let extra = tokio::time::timeout(Duration::from_millis(50), channel.next()).await;
    assert!(extra.is_err(), "no further events expected");
}

#[tokio::test]
async fn test_failed_write_publishes_nothing() {
    let (_dir, store) = open_store();
    let mut channel = store
        .open_change_channel(WatchedCollection::Equipment)
        .await
        .unwrap();

    let result = store.delete(WatchedCollection::Equipment, "missing").await;
    assert!(result.is_err());

    let next = tokio::time::timeout(Duration::from_millis(50), channel.next()).await;
    assert!(next.is_err());
}

#[tokio::test]
async fn test_duplicate_id_is_rejected() {
    let (_dir, store) = open_store();
    let branch = record(json!({"id": "b1", "name": "North Lab", "location": "Oslo"}));
    store
        .insert(WatchedCollection::Branches, branch.clone())
        .await
        .unwrap();
    let again = store.insert(WatchedCollection::Branches, branch).await;
    assert!(matches!(again, Err(Error::Store(StoreError::ConstraintViolation(_)))));
}
