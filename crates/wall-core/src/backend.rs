//! Startup-time store selection.

use std::sync::Arc;

use wall_db::{DbError, DragonflyPool, KvStore, MemoryKv, PgStore, Repository};

use crate::config::{StorageBackend, StorageConfig};

/// Connect the configured backend and return it behind the contract.
///
/// `PostgreSQL` gets its schema migrated. Key-value backends are flushed
/// first when `flush_on_startup` is set.
///
/// # Errors
///
/// Returns [`DbError`] if the engine cannot be reached or prepared.
pub async fn open_repository(config: &StorageConfig) -> Result<Arc<dyn Repository>, DbError> {
    tracing::info!(backend = %config.backend, "Opening storage backend");
    match config.backend {
        StorageBackend::Postgres => {
            let store = PgStore::connect(&config.postgres_url, config.max_connections).await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Dragonfly => {
            let pool = DragonflyPool::connect(&config.dragonfly_url).await?;
            open_kv(KvStore::new(Arc::new(pool)), config.flush_on_startup).await
        }
        StorageBackend::Memory => {
            open_kv(KvStore::new(Arc::new(MemoryKv::new())), config.flush_on_startup).await
        }
    }
}

async fn open_kv(store: KvStore, flush: bool) -> Result<Arc<dyn Repository>, DbError> {
    if flush {
        store.flush().await?;
    }
    Ok(Arc::new(store))
}
