//! Configuration, backend selection, and comment orchestration for the
//! Wall commenting service.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with environment overrides
//! - [`backend`] -- Opens the configured store behind the `Repository` contract
//! - [`service`] -- `CommentService`: parent checks and create/read orchestration

pub mod backend;
pub mod config;
pub mod service;

pub use backend::open_repository;
pub use config::{
    ConfigError, LogFormat, LoggingConfig, ServerConfig, StorageBackend, StorageConfig, WallConfig,
};
pub use service::{CommentService, ServiceError};
