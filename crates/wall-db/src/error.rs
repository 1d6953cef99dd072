//! Error types for the storage layer.
//!
//! All errors are propagated via [`DbError`]. Domain failures (validation,
//! missing records, closed posts) get their own variants; engine failures
//! wrap the underlying [`sqlx`] and [`fred`] errors unchanged. Stores never
//! retry: the first engine error aborts the operation.

use wall_types::PostId;

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Caller input failed field validation. Nothing reached the engine.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced post or comment does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// `"post"` or `"comment"`.
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// A comment was submitted to a post whose comments are closed.
    #[error("comments are not active on post {0}")]
    CommentsDisabled(PostId),

    /// A create supplied an id that is already taken.
    #[error("{entity} with id {id} already exists")]
    AlreadyExists {
        /// `"post"` or `"comment"`.
        entity: &'static str,
        /// The duplicate id.
        id: String,
    },

    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored record could not be decoded.
    #[error("corrupt record at {key}: {reason}")]
    Corrupt {
        /// Key of the offending record.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A multi-key write stopped after some keys were already written.
    ///
    /// The committed keys are not rolled back.
    #[error("write to {failed} failed after committing {committed:?}: {source}")]
    PartialWrite {
        /// Keys written before the failure, in commit order.
        committed: Vec<String>,
        /// The key whose write failed.
        failed: String,
        /// The engine error for `failed`.
        source: Box<DbError>,
    },

    /// Any other engine failure.
    #[error("engine error: {0}")]
    Engine(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Shorthand for a missing post.
    pub fn post_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "post",
            id: id.to_string(),
        }
    }

    /// Shorthand for a missing comment.
    pub fn comment_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "comment",
            id: id.to_string(),
        }
    }

    /// Whether this error came from the backing engine rather than from
    /// caller input or a missing record.
    pub const fn is_engine_error(&self) -> bool {
        matches!(
            self,
            Self::Postgres(_)
                | Self::Migration(_)
                | Self::Dragonfly(_)
                | Self::Serialization(_)
                | Self::Corrupt { .. }
                | Self::PartialWrite { .. }
                | Self::Engine(_)
        )
    }
}

impl From<validator::ValidationErrors> for DbError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
