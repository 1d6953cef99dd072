//! Axum router construction for the API.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /health` -- liveness probe
/// - `GET|POST /api/posts` -- list or create posts
/// - `GET /api/posts/{id}` -- single post with comment tree
/// - `GET|POST /api/posts/{id}/comments` -- list or create comments
/// - `GET /api/comments/{id}` -- single comment
///
/// CORS allows any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route("/api/posts/{id}", get(handlers::get_post))
        .route(
            "/api/posts/{id}/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route("/api/comments/{id}", get(handlers::get_comment))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
