//! Shared application state for the API server.

use std::sync::Arc;

use wall_core::CommentService;
use wall_db::Repository;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Orchestration over the active store.
    pub service: CommentService,
}

impl AppState {
    /// Build state over a repository.
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            service: CommentService::new(repo),
        }
    }
}
