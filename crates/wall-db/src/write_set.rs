//! Ordered multi-key writes without atomicity.
//!
//! A comment create touches up to three records. The engine offers no
//! transaction, so the writes are staged in a [`WriteSet`] and committed
//! one by one in staging order. The first failure stops the commit; keys
//! already written stay written and are reported in
//! [`DbError::PartialWrite`].

use crate::error::DbError;
use crate::kv::{Fields, KvEngine};

/// Staged record writes, committed in order.
#[derive(Debug, Default)]
pub struct WriteSet {
    writes: Vec<(String, Fields)>,
}

impl WriteSet {
    /// An empty write set.
    pub const fn new() -> Self {
        Self { writes: Vec::new() }
    }

    /// Stage `fields` to be written at `key`.
    pub fn stage(&mut self, key: String, fields: Fields) {
        self.writes.push((key, fields));
    }

    /// Keys in commit order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.writes.iter().map(|(key, _)| key.as_str())
    }

    /// Write every staged record in order.
    ///
    /// A failure on the first key returns the engine error as is, since
    /// nothing was written. A later failure returns
    /// [`DbError::PartialWrite`] naming what was committed.
    pub async fn commit(self, engine: &dyn KvEngine) -> Result<(), DbError> {
        let mut committed: Vec<String> = Vec::with_capacity(self.writes.len());
        for (key, fields) in self.writes {
            if let Err(source) = engine.set_fields(&key, &fields).await {
                if committed.is_empty() {
                    return Err(source);
                }
                tracing::warn!(
                    failed = %key,
                    committed = ?committed,
                    error = %source,
                    "Fan-out write stopped part way; committed keys are not rolled back"
                );
                return Err(DbError::PartialWrite {
                    committed,
                    failed: key,
                    source: Box::new(source),
                });
            }
            tracing::debug!(key = %key, "Record written");
            committed.push(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::kv::MemoryKv;

    fn staged(keys: &[&str]) -> WriteSet {
        let mut set = WriteSet::new();
        for key in keys {
            let mut fields = Fields::new();
            fields.insert("id".to_owned(), (*key).to_owned());
            set.stage((*key).to_owned(), fields);
        }
        set
    }

    #[tokio::test]
    async fn commits_in_staging_order() {
        let kv = MemoryKv::new();
        let set = staged(&["comment:1", "comment:0", "post:1"]);
        assert_eq!(set.keys().collect::<Vec<_>>(), ["comment:1", "comment:0", "post:1"]);
        set.commit(&kv).await.unwrap();
        assert_eq!(kv.write_count(), 3);
    }

    #[tokio::test]
    async fn first_write_failure_is_not_partial() {
        let kv = MemoryKv::new();
        kv.fail_after_writes(0).await;
        let err = staged(&["comment:1", "post:1"]).commit(&kv).await.unwrap_err();
        assert!(matches!(err, DbError::Engine(_)));
        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn later_failure_reports_committed_keys() {
        let kv = MemoryKv::new();
        kv.fail_after_writes(2).await;
        let err = staged(&["comment:1", "comment:0", "post:1"])
            .commit(&kv)
            .await
            .unwrap_err();
        match err {
            DbError::PartialWrite {
                committed, failed, ..
            } => {
                assert_eq!(committed, ["comment:1", "comment:0"]);
                assert_eq!(failed, "post:1");
            }
            other => panic!("expected PartialWrite, got {other:?}"),
        }
        assert_eq!(kv.len().await, 2);
    }
}
