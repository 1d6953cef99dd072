//! Field-level checks run before any write reaches an engine.

use validator::Validate;
use wall_types::{NewComment, NewPost};

use crate::error::DbError;

/// Check a post input: title and content must be non-empty.
pub fn check_post(post: &NewPost) -> Result<(), DbError> {
    post.validate().map_err(DbError::from)
}

/// Check a comment input: content must be 1 to 2000 characters.
pub fn check_comment(comment: &NewComment) -> Result<(), DbError> {
    comment.validate().map_err(DbError::from)
}
