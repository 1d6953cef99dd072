//! HTTP API for the Wall commenting service.
//!
//! A JSON REST surface over [`wall_core::CommentService`]. All entity
//! fields are `camelCase` on the wire.
//!
//! # Modules
//!
//! - [`router`] -- Route table with CORS and request tracing
//! - [`handlers`] -- Endpoint handlers
//! - [`state`] -- Shared handler state
//! - [`server`] -- Bind and serve with graceful shutdown
//! - [`error`] -- Error to HTTP status mapping

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
