//! Comment orchestration above the [`Repository`] contract.
//!
//! The stores enforce what their engine can: the relational store has
//! foreign keys, the key-value store checks the parent exists. Neither
//! knows that a parent must belong to the same post, so that rule lives
//! here and runs before the create.

use std::sync::Arc;

use wall_db::{DbError, Repository};
use wall_types::{Comment, CommentId, NewComment, NewPost, Post, PostId};

/// Errors surfaced by [`CommentService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Failure reported by the store, passed through unchanged.
    #[error(transparent)]
    Store(#[from] DbError),

    /// The requested parent comment does not exist.
    #[error("parent comment {0} not found")]
    ParentNotFound(CommentId),

    /// The parent comment belongs to a different post.
    #[error("parent comment {parent_id} belongs to post {parent_post}, not {post_id}")]
    ParentMismatch {
        /// The requested parent.
        parent_id: CommentId,
        /// The post the parent actually belongs to.
        parent_post: PostId,
        /// The post the new comment targets.
        post_id: PostId,
    },
}

/// Read and create posts and comments through whichever store is active.
#[derive(Clone)]
pub struct CommentService {
    repo: Arc<dyn Repository>,
}

impl CommentService {
    /// Wrap a repository.
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Every post with its comment tree.
    pub async fn posts(&self) -> Result<Vec<Post>, ServiceError> {
        Ok(self.repo.get_posts().await?)
    }

    /// One post with its comment tree.
    pub async fn post(&self, id: PostId) -> Result<Post, ServiceError> {
        Ok(self.repo.get_post_by_id(id).await?)
    }

    /// Flat comments of a post, optionally paginated.
    pub async fn comments(
        &self,
        post_id: PostId,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Comment>, ServiceError> {
        Ok(self
            .repo
            .get_comments_for_post_paginated(post_id, limit, offset)
            .await?)
    }

    /// One comment.
    pub async fn comment(&self, id: CommentId) -> Result<Comment, ServiceError> {
        Ok(self.repo.get_comment_by_id(id).await?)
    }

    /// Create a post. Note the flag is "disabled", the stored field is
    /// "active".
    pub async fn create_post(
        &self,
        title: String,
        content: String,
        comments_disabled: bool,
    ) -> Result<Post, ServiceError> {
        let input = NewPost::new(title, content, !comments_disabled).with_id(PostId::new());
        let post = self.repo.create_post(input).await?;
        tracing::info!(post_id = %post.id, comments_active = post.comments_active, "Post created");
        Ok(post)
    }

    /// Create a comment or, with `parent_id`, a reply.
    ///
    /// The parent is checked before anything is written: a missing parent
    /// is [`ServiceError::ParentNotFound`], a parent on another post is
    /// [`ServiceError::ParentMismatch`].
    pub async fn create_comment(
        &self,
        post_id: PostId,
        parent_id: Option<CommentId>,
        content: String,
    ) -> Result<Comment, ServiceError> {
        let mut input = NewComment::new(post_id, content).with_id(CommentId::new());
        if let Some(parent_id) = parent_id {
            let parent = match self.repo.get_comment_by_id(parent_id).await {
                Ok(parent) => parent,
                Err(DbError::NotFound { .. }) => return Err(ServiceError::ParentNotFound(parent_id)),
                Err(e) => return Err(e.into()),
            };
            if parent.post_id != post_id {
                return Err(ServiceError::ParentMismatch {
                    parent_id,
                    parent_post: parent.post_id,
                    post_id,
                });
            }
            input = input.reply_to(parent_id);
        }

        let comment = self.repo.create_comment(input).await?;
        tracing::info!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            parent_id = ?comment.parent_id,
            "Comment created"
        );
        Ok(comment)
    }
}
