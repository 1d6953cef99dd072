//! Flat record encoding for the key-value store.
//!
//! # Key Patterns
//!
//! | Pattern | Description |
//! |---------|-------------|
//! | `post:{id}` | Post fields plus the denormalized flat comment list |
//! | `comment:{id}` | Comment fields plus the denormalized direct replies |
//!
//! Booleans are stored as `"1"`/`"0"`, timestamps as RFC 3339 with
//! microseconds, a missing parent as the empty string, and the nested
//! `comments`/`replies` lists as JSON arrays. Decoding never falls back to
//! defaults: a malformed field is a [`DbError::Corrupt`].

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use wall_types::{Comment, CommentId, Post, PostId};

use crate::error::DbError;
use crate::kv::Fields;

/// Key prefix for post records.
pub const POST_PREFIX: &str = "post:";

/// Key prefix for comment records.
pub const COMMENT_PREFIX: &str = "comment:";

const ID: &str = "id";
const TITLE: &str = "title";
const CONTENT: &str = "content";
const COMMENTS_ACTIVE: &str = "commentsActive";
const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";
const COMMENTS: &str = "comments";
const POST_ID: &str = "postId";
const PARENT_ID: &str = "parentId";
const REPLIES: &str = "replies";

/// Record key of a post.
pub fn post_key(id: PostId) -> String {
    format!("{POST_PREFIX}{id}")
}

/// Record key of a comment.
pub fn comment_key(id: CommentId) -> String {
    format!("{COMMENT_PREFIX}{id}")
}

/// Encode a post, including its stored comment list.
pub fn encode_post(post: &Post) -> Result<Fields, DbError> {
    let mut fields = Fields::new();
    fields.insert(ID.to_owned(), post.id.to_string());
    fields.insert(TITLE.to_owned(), post.title.clone());
    fields.insert(CONTENT.to_owned(), post.content.clone());
    fields.insert(
        COMMENTS_ACTIVE.to_owned(),
        if post.comments_active { "1" } else { "0" }.to_owned(),
    );
    fields.insert(CREATED_AT.to_owned(), encode_time(post.created_at));
    fields.insert(UPDATED_AT.to_owned(), encode_time(post.updated_at));
    fields.insert(COMMENTS.to_owned(), serde_json::to_string(&post.comments)?);
    Ok(fields)
}

/// Decode a post record read from `key`.
pub fn decode_post(key: &str, fields: &Fields) -> Result<Post, DbError> {
    let record = Record { key, fields };
    let comments_active = match record.field(COMMENTS_ACTIVE)? {
        "1" => true,
        "0" => false,
        other => return Err(record.corrupt(format!("{COMMENTS_ACTIVE} is {other:?}"))),
    };
    Ok(Post {
        id: record.parse(ID)?,
        title: record.field(TITLE)?.to_owned(),
        content: record.field(CONTENT)?.to_owned(),
        comments_active,
        created_at: record.time(CREATED_AT)?,
        updated_at: record.time(UPDATED_AT)?,
        comments: record.json(COMMENTS)?,
    })
}

/// Encode a comment, including its stored reply list.
pub fn encode_comment(comment: &Comment) -> Result<Fields, DbError> {
    let mut fields = Fields::new();
    fields.insert(ID.to_owned(), comment.id.to_string());
    fields.insert(POST_ID.to_owned(), comment.post_id.to_string());
    fields.insert(
        PARENT_ID.to_owned(),
        comment.parent_id.map(|id| id.to_string()).unwrap_or_default(),
    );
    fields.insert(CONTENT.to_owned(), comment.content.clone());
    fields.insert(CREATED_AT.to_owned(), encode_time(comment.created_at));
    fields.insert(UPDATED_AT.to_owned(), encode_time(comment.updated_at));
    fields.insert(REPLIES.to_owned(), serde_json::to_string(&comment.replies)?);
    Ok(fields)
}

/// Decode a comment record read from `key`.
pub fn decode_comment(key: &str, fields: &Fields) -> Result<Comment, DbError> {
    let record = Record { key, fields };
    let parent_id = match record.field(PARENT_ID)? {
        "" => None,
        raw => Some(
            CommentId::from_str(raw)
                .map_err(|e| record.corrupt(format!("{PARENT_ID}: {e}")))?,
        ),
    };
    Ok(Comment {
        id: record.parse(ID)?,
        post_id: record.parse(POST_ID)?,
        parent_id,
        content: record.field(CONTENT)?.to_owned(),
        created_at: record.time(CREATED_AT)?,
        updated_at: record.time(UPDATED_AT)?,
        replies: record.json(REPLIES)?,
    })
}

fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A record being decoded, kept together for error reporting.
struct Record<'a> {
    key: &'a str,
    fields: &'a Fields,
}

impl Record<'_> {
    fn corrupt(&self, reason: String) -> DbError {
        DbError::Corrupt {
            key: self.key.to_owned(),
            reason,
        }
    }

    fn field(&self, name: &str) -> Result<&str, DbError> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| self.corrupt(format!("missing field {name}")))
    }

    fn parse<T>(&self, name: &str) -> Result<T, DbError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.field(name)?
            .parse()
            .map_err(|e| self.corrupt(format!("{name}: {e}")))
    }

    fn time(&self, name: &str) -> Result<DateTime<Utc>, DbError> {
        DateTime::parse_from_rfc3339(self.field(name)?)
            .map(|at| at.with_timezone(&Utc))
            .map_err(|e| self.corrupt(format!("{name}: {e}")))
    }

    fn json<T: DeserializeOwned>(&self, name: &str) -> Result<T, DbError> {
        serde_json::from_str(self.field(name)?)
            .map_err(|e| self.corrupt(format!("{name}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use wall_types::{NewComment, NewPost, now};

    use super::*;

    fn sample_comment(parent: Option<CommentId>) -> Comment {
        let mut input = NewComment::new(PostId::new(), "hello");
        if let Some(parent) = parent {
            input = input.reply_to(parent);
        }
        input.into_comment(CommentId::new(), now())
    }

    #[test]
    fn post_record_uses_flag_strings() {
        let post = NewPost::new("T", "C", false).into_post(PostId::new(), now());
        let fields = encode_post(&post).unwrap();
        assert_eq!(fields.get("commentsActive").map(String::as_str), Some("0"));
        assert_eq!(fields.get("comments").map(String::as_str), Some("[]"));
        let key = post_key(post.id);
        assert!(key.starts_with(POST_PREFIX));
        assert_eq!(decode_post(&key, &fields).unwrap(), post);
    }

    #[test]
    fn top_level_comment_stores_empty_parent() {
        let comment = sample_comment(None);
        let fields = encode_comment(&comment).unwrap();
        assert_eq!(fields.get("parentId").map(String::as_str), Some(""));
        let decoded = decode_comment(&comment_key(comment.id), &fields).unwrap();
        assert!(decoded.is_top_level());
        assert_eq!(decoded, comment);
    }

    #[test]
    fn reply_keeps_parent_and_microseconds() {
        let comment = sample_comment(Some(CommentId::new()));
        let fields = encode_comment(&comment).unwrap();
        let decoded = decode_comment("comment:x", &fields).unwrap();
        assert_eq!(decoded.parent_id, comment.parent_id);
        assert_eq!(decoded.created_at, comment.created_at);
    }

    #[test]
    fn nested_lists_survive_encoding() {
        let post_id = PostId::new();
        let mut parent = NewComment::new(post_id, "parent").into_comment(CommentId::new(), now());
        let child = NewComment::new(post_id, "child")
            .reply_to(parent.id)
            .into_comment(CommentId::new(), now());
        parent.replies.push(child.clone());

        let fields = encode_comment(&parent).unwrap();
        let decoded = decode_comment(&comment_key(parent.id), &fields).unwrap();
        assert_eq!(decoded, parent);
        assert_eq!(decoded.replies.first().and_then(|c| c.parent_id), Some(parent.id));

        let mut post = NewPost::new("T", "C", true).into_post(post_id, now());
        post.comments = vec![parent.clone(), child];
        let fields = encode_post(&post).unwrap();
        assert_eq!(decode_post(&post_key(post.id), &fields).unwrap(), post);
    }

    #[test]
    fn missing_field_is_corrupt() {
        let comment = sample_comment(None);
        let mut fields = encode_comment(&comment).unwrap();
        fields.remove("postId");
        let err = decode_comment("comment:x", &fields).unwrap_err();
        assert!(matches!(err, DbError::Corrupt { ref key, .. } if key == "comment:x"));
    }

    #[test]
    fn bad_flag_is_corrupt_not_false() {
        let post = NewPost::new("T", "C", true).into_post(PostId::new(), now());
        let mut fields = encode_post(&post).unwrap();
        fields.insert("commentsActive".to_owned(), "yes".to_owned());
        assert!(matches!(
            decode_post("post:x", &fields),
            Err(DbError::Corrupt { .. })
        ));
    }

    #[test]
    fn bad_timestamp_is_corrupt() {
        let comment = sample_comment(None);
        let mut fields = encode_comment(&comment).unwrap();
        fields.insert("createdAt".to_owned(), "yesterday".to_owned());
        assert!(matches!(
            decode_comment("comment:x", &fields),
            Err(DbError::Corrupt { .. })
        ));
    }
}
