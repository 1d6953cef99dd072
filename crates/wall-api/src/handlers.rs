//! REST API endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/posts` | All posts with comment trees |
//! | `POST` | `/api/posts` | Create a post |
//! | `GET` | `/api/posts/{id}` | One post with its comment tree |
//! | `GET` | `/api/posts/{id}/comments` | Flat comments, `?limit&offset` |
//! | `POST` | `/api/posts/{id}/comments` | Create a comment or reply |
//! | `GET` | `/api/comments/{id}` | One comment |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;
use wall_types::{CommentId, PostId};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies and query parameters
// ---------------------------------------------------------------------------

/// Body of `POST /api/posts`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    /// Post title.
    pub title: String,
    /// Post body.
    pub content: String,
    /// Close comments from the start. Defaults to `false`.
    #[serde(default)]
    pub comments_disabled: bool,
}

/// Body of `POST /api/posts/{id}/comments`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    /// Parent comment for replies.
    #[serde(default)]
    pub parent_id: Option<CommentId>,
    /// Comment body.
    pub content: String,
}

/// Query parameters for `GET /api/posts/{id}/comments`.
#[derive(Debug, serde::Deserialize)]
pub struct CommentsQuery {
    /// Maximum number of comments.
    pub limit: Option<u32>,
    /// Number of comments to skip.
    pub offset: Option<u32>,
}

fn parse_uuid(s: &str) -> Result<Uuid, ApiError> {
    s.parse::<Uuid>()
        .map_err(|e| ApiError::InvalidUuid(format!("{s}: {e}")))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe.
#[allow(clippy::unused_async)]
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

/// List every post, oldest first, each with its comment tree.
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.service.posts().await?;
    Ok(Json(posts))
}

/// Create a post.
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let post = state
        .service
        .create_post(req.title, req.content, req.comments_disabled)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// One post with its comment tree.
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = PostId::from(parse_uuid(&id_str)?);
    let post = state.service.post(id).await?;
    Ok(Json(post))
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// Flat comments of a post. Paginated only when both `limit` and `offset`
/// are given.
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    query: Result<Query<CommentsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = PostId::from(parse_uuid(&id_str)?);
    let Query(params) = query.map_err(|e| ApiError::InvalidQuery(e.body_text()))?;
    let comments = state
        .service
        .comments(id, params.limit, params.offset)
        .await?;
    Ok(Json(comments))
}

/// Create a comment on a post, or a reply when `parentId` is set.
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    body: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = PostId::from(parse_uuid(&id_str)?);
    let Json(req) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let comment = state
        .service
        .create_comment(post_id, req.parent_id, req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// One comment.
pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = CommentId::from(parse_uuid(&id_str)?);
    let comment = state.service.comment(id).await?;
    Ok(Json(comment))
}
