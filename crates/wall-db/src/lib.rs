//! Storage layer for the Wall commenting service (`PostgreSQL` + `Dragonfly`).
//!
//! Two strategies implement one [`Repository`] contract:
//!
//! ```text
//! Repository (trait)
//!     |
//!     +-- PgStore  --> PostgreSQL (sqlx pool, migrations)
//!     |     native foreign keys, cascade, LIMIT/OFFSET
//!     |
//!     +-- KvStore  --> KvEngine
//!           |-- DragonflyPool  (HSET / HGETALL / KEYS / FLUSHALL)
//!           +-- MemoryKv       (in-process, fault injection)
//!           denormalized records, fan-out writes, full-scan filtering
//! ```
//!
//! # Modules
//!
//! - [`repository`] -- The storage contract and in-memory pagination
//! - [`pg_store`] -- Relational store
//! - [`kv_store`] -- Key-value store and denormalization audit
//! - [`kv`] -- Key-value engine seam and the in-process engine
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) engine
//! - [`records`] -- Flat record encoding and key layout
//! - [`write_set`] -- Ordered, non-atomic multi-key writes
//! - [`validate`] -- Field checks run before any write
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod kv;
pub mod kv_store;
pub mod pg_store;
pub mod records;
pub mod repository;
pub mod validate;
pub mod write_set;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyPool;
pub use error::DbError;
pub use kv::{Fields, KvEngine, MemoryKv};
pub use kv_store::{DenormalizationReport, KvStore};
pub use pg_store::{CommentRow, PgStore, PostRow};
pub use repository::{Page, Repository};
pub use write_set::WriteSet;
