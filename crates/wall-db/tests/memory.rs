//! Repository contract tests against the in-process key-value engine.
//!
//! These run in every `cargo test`.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

mod common;

use std::sync::Arc;

use wall_db::{KvEngine, KvStore, MemoryKv, Repository};
use wall_types::{NewComment, NewPost};

#[tokio::test]
async fn memory_store_satisfies_contract() {
    let store = KvStore::new(Arc::new(MemoryKv::new()));
    common::run_contract(&store).await;
}

#[tokio::test]
async fn records_use_prefixed_keys() {
    let kv = Arc::new(MemoryKv::new());
    let store = KvStore::new(kv.clone());
    let post = store
        .create_post(NewPost::new("T", "C", true))
        .await
        .unwrap();
    let root = store
        .create_comment(NewComment::new(post.id, "root"))
        .await
        .unwrap();
    store
        .create_comment(NewComment::new(post.id, "reply").reply_to(root.id))
        .await
        .unwrap();

    let mut keys = kv.keys_with_prefix("").await.unwrap();
    keys.sort();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().all(|k| k.starts_with("post:") || k.starts_with("comment:")));

    let stored = kv.get_fields(&format!("post:{}", post.id)).await.unwrap();
    let embedded: Vec<serde_json::Value> =
        serde_json::from_str(stored.get("comments").unwrap()).unwrap();
    assert_eq!(embedded.len(), 2);
}

#[tokio::test]
async fn audit_reports_clean_store() {
    let store = KvStore::new(Arc::new(MemoryKv::new()));
    let post = store
        .create_post(NewPost::new("T", "C", true))
        .await
        .unwrap();
    let root = store
        .create_comment(NewComment::new(post.id, "root"))
        .await
        .unwrap();
    store
        .create_comment(NewComment::new(post.id, "reply").reply_to(root.id))
        .await
        .unwrap();
    assert!(store.audit_post(post.id).await.unwrap().is_consistent());
}

#[tokio::test]
async fn flush_empties_store() {
    let kv = Arc::new(MemoryKv::new());
    let store = KvStore::new(kv.clone());
    store
        .create_post(NewPost::new("T", "C", true))
        .await
        .unwrap();
    store.flush().await.unwrap();
    assert!(kv.is_empty().await);
    assert!(store.get_posts().await.unwrap().is_empty());
}
