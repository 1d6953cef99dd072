//! Core entity structs: [`Post`], [`Comment`], and their create inputs.
//!
//! `Post::comments` and `Comment::replies` are derived views. Stores fill
//! them on read; callers never write them directly.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ids::{CommentId, PostId};

/// Maximum length of a comment body, in characters.
pub const MAX_COMMENT_LEN: usize = 2000;

/// A top-level content item that owns zero or more comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Immutable identifier, assigned at creation.
    pub id: PostId,
    /// Non-empty title.
    pub title: String,
    /// Non-empty body.
    pub content: String,
    /// Whether new comments may be created under this post.
    pub comments_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Equal to `created_at`; there is no update path yet.
    pub updated_at: DateTime<Utc>,
    /// Comments belonging to this post.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// A reply to a post or to another comment of the same post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Immutable identifier, unique across all posts.
    pub id: CommentId,
    /// The post this comment belongs to.
    pub post_id: PostId,
    /// Parent comment in the same post; `None` for top-level comments.
    pub parent_id: Option<CommentId>,
    /// Non-empty body of at most [`MAX_COMMENT_LEN`] characters.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Equal to `created_at`; there is no update path yet.
    pub updated_at: DateTime<Utc>,
    /// Direct child comments.
    #[serde(default)]
    pub replies: Vec<Comment>,
}

impl Comment {
    /// Whether this is a top-level comment.
    pub const fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Ordering key used for every deterministic comment listing.
    pub const fn sort_key(&self) -> (DateTime<Utc>, CommentId) {
        (self.created_at, self.id)
    }
}

/// Input for creating a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    /// Caller-supplied id; generated by the store when absent.
    #[serde(default)]
    pub id: Option<PostId>,
    /// Post title.
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    /// Post body.
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
    /// Whether comments are open.
    pub comments_active: bool,
}

impl NewPost {
    /// Build an input with a store-generated id.
    pub fn new(title: impl Into<String>, content: impl Into<String>, comments_active: bool) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            comments_active,
        }
    }

    /// Set a caller-supplied id.
    #[must_use]
    pub const fn with_id(mut self, id: PostId) -> Self {
        self.id = Some(id);
        self
    }

    /// Materialize the stored post with the given id and timestamp.
    pub fn into_post(self, id: PostId, now: DateTime<Utc>) -> Post {
        Post {
            id,
            title: self.title,
            content: self.content,
            comments_active: self.comments_active,
            created_at: now,
            updated_at: now,
            comments: Vec::new(),
        }
    }
}

/// Input for creating a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    /// Caller-supplied id; generated by the store when absent.
    #[serde(default)]
    pub id: Option<CommentId>,
    /// The post to comment on.
    pub post_id: PostId,
    /// Parent comment, for replies.
    #[serde(default)]
    pub parent_id: Option<CommentId>,
    /// Comment body.
    #[validate(length(min = 1, max = 2000, message = "content must be 1 to 2000 characters"))]
    pub content: String,
}

impl NewComment {
    /// Build a top-level comment input with a store-generated id.
    pub fn new(post_id: PostId, content: impl Into<String>) -> Self {
        Self {
            id: None,
            post_id,
            parent_id: None,
            content: content.into(),
        }
    }

    /// Make this a reply to `parent`.
    #[must_use]
    pub const fn reply_to(mut self, parent: CommentId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    /// Set a caller-supplied id.
    #[must_use]
    pub const fn with_id(mut self, id: CommentId) -> Self {
        self.id = Some(id);
        self
    }

    /// Materialize the stored comment with the given id and timestamp.
    pub fn into_comment(self, id: CommentId, now: DateTime<Utc>) -> Comment {
        Comment {
            id,
            post_id: self.post_id,
            parent_id: self.parent_id,
            content: self.content,
            created_at: now,
            updated_at: now,
            replies: Vec::new(),
        }
    }
}

/// Current time truncated to microseconds.
///
/// `PostgreSQL` keeps microsecond precision; truncating at stamping time
/// keeps both backends returning identical timestamps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
