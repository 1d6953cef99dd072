//! The storage contract shared by every backend.
//!
//! Callers depend only on [`Repository`]; which backend sits behind it is
//! decided once at startup. Both implementations return comment listings
//! in the same deterministic order, `(created_at, id)` ascending.

use async_trait::async_trait;
use wall_types::{Comment, CommentId, NewComment, NewPost, Post, PostId};

use crate::error::DbError;

/// Storage operations for posts and comments.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Every post, oldest first, each with its comment tree populated.
    async fn get_posts(&self) -> Result<Vec<Post>, DbError>;

    /// Validate, stamp, and store a new post.
    async fn create_post(&self, post: NewPost) -> Result<Post, DbError>;

    /// A single post with its comment tree populated.
    ///
    /// Fails with [`DbError::NotFound`] if no such post exists.
    async fn get_post_by_id(&self, id: PostId) -> Result<Post, DbError>;

    /// Validate, stamp, and store a new comment.
    ///
    /// Fails with [`DbError::NotFound`] if the post is missing and with
    /// [`DbError::CommentsDisabled`] if its comments are closed.
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, DbError>;

    /// A single comment. Fails with [`DbError::NotFound`] if absent.
    async fn get_comment_by_id(&self, id: CommentId) -> Result<Comment, DbError>;

    /// The flat comment listing of one post; empty when it has none.
    async fn get_comments_for_post(&self, post_id: PostId) -> Result<Vec<Comment>, DbError>;

    /// A slice of [`Repository::get_comments_for_post`].
    ///
    /// With both `limit` and `offset` the result is `[offset, offset + limit)`
    /// clamped to the listing; an offset past the end gives an empty list.
    /// If either is `None` the full listing is returned.
    async fn get_comments_for_post_paginated(
        &self,
        post_id: PostId,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Comment>, DbError>;
}

/// A requested `[offset, offset + limit)` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Maximum number of items.
    pub limit: u32,
    /// Number of items to skip.
    pub offset: u32,
}

impl Page {
    /// A page only exists when both bounds were given.
    pub const fn from_parts(limit: Option<u32>, offset: Option<u32>) -> Option<Self> {
        match (limit, offset) {
            (Some(limit), Some(offset)) => Some(Self { limit, offset }),
            _ => None,
        }
    }

    /// Cut this page out of an in-memory listing.
    pub fn slice<T>(self, mut items: Vec<T>) -> Vec<T> {
        let start = usize::try_from(self.offset).unwrap_or(usize::MAX);
        if start >= items.len() {
            return Vec::new();
        }
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        let end = start.saturating_add(limit).min(items.len());
        items.truncate(end);
        items.split_off(start)
    }
}
