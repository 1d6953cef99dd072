//! The key-value engine seam.
//!
//! The key-value store needs only four primitives from its engine: write a
//! flat field map at a key, read it back, list keys by prefix, and wipe
//! everything. [`KvEngine`] captures exactly that, so the same store logic
//! runs against `Dragonfly` ([`crate::DragonflyPool`]) or the in-process
//! [`MemoryKv`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DbError;

/// A flat record: field name to string value.
pub type Fields = BTreeMap<String, String>;

/// Minimal key-value engine interface.
#[async_trait]
pub trait KvEngine: Send + Sync {
    /// Write every field in `fields` at `key` (HSET semantics).
    async fn set_fields(&self, key: &str, fields: &Fields) -> Result<(), DbError>;

    /// Read all fields at `key`. An absent key yields an empty map.
    async fn get_fields(&self, key: &str) -> Result<Fields, DbError>;

    /// All keys starting with `prefix`, in no particular order.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, DbError>;

    /// Delete every key.
    async fn flush_all(&self) -> Result<(), DbError>;
}

/// In-process [`KvEngine`] backed by a `BTreeMap`.
///
/// Counts writes and can be told to fail after a number of successful
/// writes, which is how the fan-out failure paths are tested.
#[derive(Debug, Default)]
pub struct MemoryKv {
    data: RwLock<BTreeMap<String, Fields>>,
    writes: AtomicU64,
    fail_after: RwLock<Option<u64>>,
}

impl MemoryKv {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set_fields` calls so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every write fail once `n` more writes have succeeded.
    pub async fn fail_after_writes(&self, n: u64) {
        let limit = self.write_count().saturating_add(n);
        *self.fail_after.write().await = Some(limit);
    }

    /// Clear any injected failure.
    pub async fn heal(&self) {
        *self.fail_after.write().await = None;
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether no keys are stored.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl KvEngine for MemoryKv {
    async fn set_fields(&self, key: &str, fields: &Fields) -> Result<(), DbError> {
        let fail_after = *self.fail_after.read().await;
        if fail_after.is_some_and(|limit| self.write_count() >= limit) {
            return Err(DbError::Engine(format!("injected write failure at {key}")));
        }
        let mut data = self.data.write().await;
        let record = data.entry(key.to_owned()).or_default();
        for (name, value) in fields {
            record.insert(name.clone(), value.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_fields(&self, key: &str) -> Result<Fields, DbError> {
        Ok(self.data.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, DbError> {
        Ok(self
            .data
            .read()
            .await
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn flush_all(&self) -> Result<(), DbError> {
        self.data.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[tokio::test]
    async fn set_merges_fields_like_hset() {
        let kv = MemoryKv::new();
        kv.set_fields("post:1", &fields(&[("a", "1"), ("b", "2")])).await.ok();
        kv.set_fields("post:1", &fields(&[("b", "3")])).await.ok();
        let got = kv.get_fields("post:1").await.unwrap_or_default();
        assert_eq!(got, fields(&[("a", "1"), ("b", "3")]));
        assert_eq!(kv.write_count(), 2);
    }

    #[tokio::test]
    async fn absent_key_reads_empty() {
        let kv = MemoryKv::new();
        assert!(kv.get_fields("nope").await.is_ok_and(|f| f.is_empty()));
    }

    #[tokio::test]
    async fn prefix_scan_only_returns_matching_keys() {
        let kv = MemoryKv::new();
        for key in ["comment:1", "post:1", "comment:2", "posts"] {
            kv.set_fields(key, &fields(&[("id", key)])).await.ok();
        }
        let keys = kv.keys_with_prefix("post:").await.unwrap_or_default();
        assert_eq!(keys, vec!["post:1".to_owned()]);
        let keys = kv.keys_with_prefix("comment:").await.unwrap_or_default();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn injected_failure_blocks_later_writes() {
        let kv = MemoryKv::new();
        kv.fail_after_writes(1).await;
        assert!(kv.set_fields("a", &fields(&[("x", "1")])).await.is_ok());
        assert!(kv.set_fields("b", &fields(&[("x", "1")])).await.is_err());
        assert_eq!(kv.len().await, 1);
        kv.heal().await;
        assert!(kv.set_fields("b", &fields(&[("x", "1")])).await.is_ok());
    }

    #[tokio::test]
    async fn flush_clears_everything() {
        let kv = MemoryKv::new();
        kv.set_fields("a", &fields(&[("x", "1")])).await.ok();
        kv.flush_all().await.ok();
        assert!(kv.is_empty().await);
    }
}
