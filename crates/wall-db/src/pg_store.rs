//! Relational [`Repository`] over `PostgreSQL`.
//!
//! A thin translation layer. Referential integrity (comment to post,
//! comment to parent) and reply cascade are schema constraints; this module
//! only maps their violations onto [`DbError`] variants. Listings are
//! ordered by `(created_at, id)` and pagination is pushed to the engine.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use uuid::Uuid;
use wall_types::{Comment, CommentId, NewComment, NewPost, Post, PostId, build_comment_tree, now};

use crate::error::DbError;
use crate::repository::{Page, Repository};
use crate::validate::{check_comment, check_post};

const POST_COLUMNS: &str = "id, title, content, comments_active, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, post_id, parent_id, content, created_at, updated_at";

/// Seconds to wait for a pooled connection.
const ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Seconds before an idle connection is dropped.
const IDLE_TIMEOUT_SECS: u64 = 300;

/// Repository backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool on `url` and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed,
    /// [`DbError::Postgres`] if the connection fails, and
    /// [`DbError::Migration`] if a migration fails.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DbError> {
        let options: PgConnectOptions = url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("invalid database URL: {e}")))?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(Duration::from_secs(IDLE_TIMEOUT_SECS))
            .connect_with(options)
            .await?;
        tracing::info!(max_connections, "Connected to PostgreSQL");

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply pending migrations. Already-applied ones are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if any migration fails.
    pub async fn migrate(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::debug!("Schema migrations applied");
        Ok(())
    }

    async fn fetch_comments(&self, post_id: PostId) -> Result<Vec<Comment>, DbError> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY created_at, id"
        ))
        .bind(post_id.into_inner())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }
}

/// Map an insert failure onto the matching domain error.
fn insert_error(err: sqlx::Error, entity: &'static str, id: Uuid, parent: Option<Uuid>) -> DbError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return DbError::AlreadyExists {
                entity,
                id: id.to_string(),
            };
        }
        if let Some(parent) = parent.filter(|_| db.is_foreign_key_violation()) {
            return DbError::comment_not_found(parent);
        }
    }
    DbError::Postgres(err)
}

#[async_trait]
impl Repository for PgStore {
    async fn get_posts(&self) -> Result<Vec<Post>, DbError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();

        let comment_rows = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ANY($1) ORDER BY created_at, id"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_post: HashMap<PostId, Vec<Comment>> = HashMap::new();
        for row in comment_rows {
            let comment = Comment::from(row);
            by_post.entry(comment.post_id).or_default().push(comment);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut post = Post::from(row);
                post.comments = build_comment_tree(by_post.remove(&post.id).unwrap_or_default());
                post
            })
            .collect())
    }

    async fn create_post(&self, input: NewPost) -> Result<Post, DbError> {
        check_post(&input)?;
        let id = input.id.unwrap_or_default();
        let post = input.into_post(id, now());
        sqlx::query(
            r"INSERT INTO posts (id, title, content, comments_active, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(post.id.into_inner())
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.comments_active)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, "post", post.id.into_inner(), None))?;

        tracing::debug!(post_id = %post.id, "Post inserted");
        Ok(post)
    }

    async fn get_post_by_id(&self, id: PostId) -> Result<Post, DbError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::post_not_found(id))?;

        let mut post = Post::from(row);
        post.comments = build_comment_tree(self.fetch_comments(id).await?);
        Ok(post)
    }

    async fn create_comment(&self, input: NewComment) -> Result<Comment, DbError> {
        check_comment(&input)?;
        let post_id = input.post_id;
        let id = input.id.unwrap_or_default();
        let comment = input.into_comment(id, now());

        let mut tx = self.pool.begin().await?;

        let active: Option<bool> =
            sqlx::query_scalar("SELECT comments_active FROM posts WHERE id = $1 FOR SHARE")
                .bind(post_id.into_inner())
                .fetch_optional(&mut *tx)
                .await?;
        match active {
            None => return Err(DbError::post_not_found(post_id)),
            Some(false) => return Err(DbError::CommentsDisabled(post_id)),
            Some(true) => {}
        }

        let parent = comment.parent_id.map(CommentId::into_inner);
        sqlx::query(
            r"INSERT INTO comments (id, post_id, parent_id, content, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(comment.id.into_inner())
        .bind(post_id.into_inner())
        .bind(parent)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| insert_error(e, "comment", comment.id.into_inner(), parent))?;

        tx.commit().await?;

        tracing::debug!(
            comment_id = %comment.id,
            post_id = %post_id,
            parent_id = ?comment.parent_id,
            "Comment inserted"
        );
        Ok(comment)
    }

    /// The comment with its direct replies filled in.
    async fn get_comment_by_id(&self, id: CommentId) -> Result<Comment, DbError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::comment_not_found(id))?;

        let replies = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE parent_id = $1 ORDER BY created_at, id"
        ))
        .bind(id.into_inner())
        .fetch_all(&self.pool)
        .await?;

        let mut comment = Comment::from(row);
        comment.replies = replies.into_iter().map(Comment::from).collect();
        Ok(comment)
    }

    async fn get_comments_for_post(&self, post_id: PostId) -> Result<Vec<Comment>, DbError> {
        self.fetch_comments(post_id).await
    }

    async fn get_comments_for_post_paginated(
        &self,
        post_id: PostId,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Comment>, DbError> {
        let Some(page) = Page::from_parts(limit, offset) else {
            return self.fetch_comments(post_id).await;
        };
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            r"SELECT {COMMENT_COLUMNS} FROM comments
              WHERE post_id = $1
              ORDER BY created_at, id
              LIMIT $2 OFFSET $3"
        ))
        .bind(post_id.into_inner())
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }
}

/// A row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    /// Post ID.
    pub id: Uuid,
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
    /// Whether comments are open.
    pub comments_active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: PostId::from(row.id),
            title: row.title,
            content: row.content,
            comments_active: row.comments_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            comments: Vec::new(),
        }
    }
}

/// A row from the `comments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    /// Comment ID.
    pub id: Uuid,
    /// Owning post.
    pub post_id: Uuid,
    /// Parent comment, if a reply.
    pub parent_id: Option<Uuid>,
    /// Body.
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: CommentId::from(row.id),
            post_id: PostId::from(row.post_id),
            parent_id: row.parent_id.map(CommentId::from),
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
            replies: Vec::new(),
        }
    }
}
