//! Key-value [`Repository`] over any [`KvEngine`].
//!
//! The engine has no relationships, no secondary index, and no
//! transactions, so this store emulates them:
//!
//! - Comments of a post are found by scanning every `comment:*` record and
//!   filtering on `postId`. Reads are O(total comments), not O(comments of
//!   the post).
//! - A comment create fans out to up to three records (the comment, its
//!   parent's `replies`, the post's `comments`) through a [`WriteSet`]. There
//!   is no rollback and no mutual exclusion; two concurrent creates can lose
//!   one denormalized update. [`KvStore::audit_post`] detects that.
//! - Listings are ordered by `(created_at, id)` after the scan.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use wall_types::{Comment, CommentId, NewComment, NewPost, Post, PostId, build_comment_tree, now};

use crate::error::DbError;
use crate::kv::KvEngine;
use crate::records::{
    COMMENT_PREFIX, POST_PREFIX, comment_key, decode_comment, decode_post, encode_comment,
    encode_post, post_key,
};
use crate::repository::{Page, Repository};
use crate::validate::{check_comment, check_post};
use crate::write_set::WriteSet;

/// Repository backed by a key-value engine.
#[derive(Clone)]
pub struct KvStore {
    engine: Arc<dyn KvEngine>,
}

/// Differences between the flat comment records of a post and the
/// denormalized copies embedded in the post and parent records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenormalizationReport {
    /// Comments that exist but are absent from the post's `comments` blob.
    pub missing_from_post: Vec<CommentId>,
    /// `(parent, child)` pairs where the child exists but is absent from
    /// the parent's `replies` blob.
    pub missing_from_parents: Vec<(CommentId, CommentId)>,
}

impl DenormalizationReport {
    /// Whether every denormalized copy agrees with the flat records.
    pub fn is_consistent(&self) -> bool {
        self.missing_from_post.is_empty() && self.missing_from_parents.is_empty()
    }
}

/// A comment create whose reads are done and whose writes are staged.
pub(crate) struct PlannedComment {
    pub(crate) comment: Comment,
    pub(crate) writes: WriteSet,
}

impl KvStore {
    /// Build a store over `engine`.
    pub fn new(engine: Arc<dyn KvEngine>) -> Self {
        Self { engine }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &dyn KvEngine {
        self.engine.as_ref()
    }

    /// Delete every record. Used at startup when configured to.
    pub async fn flush(&self) -> Result<(), DbError> {
        self.engine.flush_all().await
    }

    /// The post record as stored, embedded `comments` blob included.
    async fn load_post(&self, id: PostId) -> Result<Option<Post>, DbError> {
        let key = post_key(id);
        let fields = self.engine.get_fields(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        decode_post(&key, &fields).map(Some)
    }

    /// The comment record as stored, embedded `replies` blob included.
    async fn load_comment(&self, id: CommentId) -> Result<Option<Comment>, DbError> {
        let key = comment_key(id);
        let fields = self.engine.get_fields(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        decode_comment(&key, &fields).map(Some)
    }

    /// Every comment record in the store, as stored.
    ///
    /// There is no secondary index: this reads every `comment:*` key.
    async fn scan_comments(&self) -> Result<Vec<Comment>, DbError> {
        let keys = self.engine.keys_with_prefix(COMMENT_PREFIX).await?;
        let mut comments = Vec::with_capacity(keys.len());
        for key in &keys {
            let fields = self.engine.get_fields(key).await?;
            if fields.is_empty() {
                continue;
            }
            comments.push(decode_comment(key, &fields)?);
        }
        Ok(comments)
    }

    /// The flat, ordered comment listing of one post, `replies` cleared.
    async fn flat_comments(&self, post_id: PostId) -> Result<Vec<Comment>, DbError> {
        let mut comments: Vec<Comment> = self
            .scan_comments()
            .await?
            .into_iter()
            .filter(|comment| comment.post_id == post_id)
            .map(|mut comment| {
                comment.replies.clear();
                comment
            })
            .collect();
        comments.sort_by_key(Comment::sort_key);
        Ok(comments)
    }

    /// Run every read and validation for a comment create and stage its
    /// writes: comment, then parent, then post.
    pub(crate) async fn plan_comment(&self, input: NewComment) -> Result<PlannedComment, DbError> {
        check_comment(&input)?;

        let id = input.id.unwrap_or_default();
        if self.load_comment(id).await?.is_some() {
            return Err(DbError::AlreadyExists {
                entity: "comment",
                id: id.to_string(),
            });
        }

        let mut post = self
            .load_post(input.post_id)
            .await?
            .ok_or_else(|| DbError::post_not_found(input.post_id))?;
        if !post.comments_active {
            return Err(DbError::CommentsDisabled(post.id));
        }
        post.comments = self.flat_comments(post.id).await?;

        let parent = match input.parent_id {
            Some(parent_id) => Some(
                self.load_comment(parent_id)
                    .await?
                    .ok_or_else(|| DbError::comment_not_found(parent_id))?,
            ),
            None => None,
        };

        let comment = input.into_comment(id, now());
        let mut writes = WriteSet::new();
        writes.stage(comment_key(comment.id), encode_comment(&comment)?);
        if let Some(mut parent) = parent {
            parent.replies.push(comment.clone());
            writes.stage(comment_key(parent.id), encode_comment(&parent)?);
        }
        post.comments.push(comment.clone());
        writes.stage(post_key(post.id), encode_post(&post)?);

        Ok(PlannedComment { comment, writes })
    }

    /// Compare the flat comment records of `post_id` with the copies
    /// embedded in the post record and in each parent record.
    pub async fn audit_post(&self, post_id: PostId) -> Result<DenormalizationReport, DbError> {
        let post = self
            .load_post(post_id)
            .await?
            .ok_or_else(|| DbError::post_not_found(post_id))?;
        let embedded: BTreeSet<CommentId> = post.comments.iter().map(|c| c.id).collect();

        let records: HashMap<CommentId, Comment> = self
            .scan_comments()
            .await?
            .into_iter()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| (comment.id, comment))
            .collect();

        let mut flat: Vec<&Comment> = records.values().collect();
        flat.sort_by_key(|comment| comment.sort_key());

        let mut report = DenormalizationReport::default();
        for comment in flat {
            if !embedded.contains(&comment.id) {
                report.missing_from_post.push(comment.id);
            }
            let Some(parent_id) = comment.parent_id else {
                continue;
            };
            let in_parent = records
                .get(&parent_id)
                .is_some_and(|parent| parent.replies.iter().any(|r| r.id == comment.id));
            if !in_parent {
                report.missing_from_parents.push((parent_id, comment.id));
            }
        }

        if !report.is_consistent() {
            tracing::warn!(
                post_id = %post_id,
                missing_from_post = report.missing_from_post.len(),
                missing_from_parents = report.missing_from_parents.len(),
                "Denormalized comment copies have drifted"
            );
        }
        Ok(report)
    }
}

#[async_trait]
impl Repository for KvStore {
    async fn get_posts(&self) -> Result<Vec<Post>, DbError> {
        let keys = self.engine.keys_with_prefix(POST_PREFIX).await?;
        let mut posts = Vec::with_capacity(keys.len());
        for key in &keys {
            let fields = self.engine.get_fields(key).await?;
            if fields.is_empty() {
                continue;
            }
            posts.push(decode_post(key, &fields)?);
        }

        let mut by_post: HashMap<PostId, Vec<Comment>> = HashMap::new();
        for comment in self.scan_comments().await? {
            by_post.entry(comment.post_id).or_default().push(comment);
        }
        for post in &mut posts {
            post.comments = build_comment_tree(by_post.remove(&post.id).unwrap_or_default());
        }

        posts.sort_by_key(|post| (post.created_at, post.id));
        Ok(posts)
    }

    async fn create_post(&self, input: NewPost) -> Result<Post, DbError> {
        check_post(&input)?;
        let id = input.id.unwrap_or_default();
        if self.load_post(id).await?.is_some() {
            return Err(DbError::AlreadyExists {
                entity: "post",
                id: id.to_string(),
            });
        }
        let post = input.into_post(id, now());
        self.engine
            .set_fields(&post_key(post.id), &encode_post(&post)?)
            .await?;
        tracing::debug!(post_id = %post.id, "Post stored");
        Ok(post)
    }

    async fn get_post_by_id(&self, id: PostId) -> Result<Post, DbError> {
        let mut post = self
            .load_post(id)
            .await?
            .ok_or_else(|| DbError::post_not_found(id))?;
        post.comments = build_comment_tree(self.flat_comments(id).await?);
        Ok(post)
    }

    async fn create_comment(&self, input: NewComment) -> Result<Comment, DbError> {
        let PlannedComment { comment, writes } = self.plan_comment(input).await?;
        let keys: Vec<String> = writes.keys().map(str::to_owned).collect();
        writes.commit(self.engine.as_ref()).await?;
        tracing::debug!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            parent_id = ?comment.parent_id,
            keys = ?keys,
            "Comment stored"
        );
        Ok(comment)
    }

    async fn get_comment_by_id(&self, id: CommentId) -> Result<Comment, DbError> {
        self.load_comment(id)
            .await?
            .ok_or_else(|| DbError::comment_not_found(id))
    }

    async fn get_comments_for_post(&self, post_id: PostId) -> Result<Vec<Comment>, DbError> {
        self.flat_comments(post_id).await
    }

    async fn get_comments_for_post_paginated(
        &self,
        post_id: PostId,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Comment>, DbError> {
        let comments = self.flat_comments(post_id).await?;
        Ok(match Page::from_parts(limit, offset) {
            Some(page) => page.slice(comments),
            None => comments,
        })
    }
}
