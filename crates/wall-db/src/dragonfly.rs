//! `Dragonfly` (Redis-compatible) engine for the key-value store.
//!
//! Records are stored as hashes. Only four commands are used:
//!
//! | Operation | Command |
//! |-----------|---------|
//! | [`KvEngine::set_fields`] | `HSET key f1 v1 f2 v2 ...` |
//! | [`KvEngine::get_fields`] | `HGETALL key` |
//! | [`KvEngine::keys_with_prefix`] | `KEYS prefix*` |
//! | [`KvEngine::flush_all`] | `FLUSHALL` |

use std::collections::HashMap;

use async_trait::async_trait;
use fred::prelude::*;

use crate::error::DbError;
use crate::kv::{Fields, KvEngine};

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }
}

#[async_trait]
impl KvEngine for DragonflyPool {
    async fn set_fields(&self, key: &str, fields: &Fields) -> Result<(), DbError> {
        if fields.is_empty() {
            return Ok(());
        }
        let values: HashMap<String, String> = fields
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let _: u64 = self.client.hset(key, values).await?;
        Ok(())
    }

    async fn get_fields(&self, key: &str) -> Result<Fields, DbError> {
        let values: HashMap<String, String> = self.client.hgetall(key).await?;
        Ok(values.into_iter().collect())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, DbError> {
        let pattern = format!("{prefix}*");
        let keys: Vec<String> = self
            .client
            .custom(fred::cmd!("KEYS"), vec![pattern])
            .await?;
        Ok(keys)
    }

    /// **WARNING:** This deletes all data in the selected database.
    async fn flush_all(&self) -> Result<(), DbError> {
        let _: () = self.client.flushall(false).await?;
        tracing::warn!("Dragonfly flushed");
        Ok(())
    }
}
