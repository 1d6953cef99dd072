//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. The body
//! is always `{"error": <message>, "status": <code>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use wall_core::ServiceError;
use wall_db::DbError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// An invalid query parameter was provided.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The request body could not be decoded.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// The input failed field validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Comments are closed on the target post.
    #[error("{0}")]
    CommentsDisabled(String),

    /// The id is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The parent comment belongs to a different post.
    #[error("{0}")]
    ParentMismatch(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::ParentNotFound(_) => Self::NotFound(err.to_string()),
            ServiceError::ParentMismatch { .. } => Self::ParentMismatch(err.to_string()),
            ServiceError::Store(db) => db.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Validation(msg) => Self::Validation(msg),
            DbError::NotFound { .. } => Self::NotFound(err.to_string()),
            DbError::CommentsDisabled(_) => Self::CommentsDisabled(err.to_string()),
            DbError::AlreadyExists { .. } => Self::Conflict(err.to_string()),
            other => {
                tracing::error!(error = %other, "Storage failure");
                Self::Internal("storage failure".to_owned())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::InvalidUuid(msg) | Self::InvalidQuery(msg) | Self::InvalidBody(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, format!("validation error: {msg}")),
            Self::CommentsDisabled(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::ParentMismatch(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
