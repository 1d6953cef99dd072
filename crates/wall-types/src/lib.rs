//! Shared type definitions for the Wall commenting service.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for post and comment identifiers
//! - [`structs`] -- `Post`, `Comment`, and the validated create inputs
//! - [`tree`] -- Flat listing to nested reply tree reconstruction

pub mod ids;
pub mod structs;
pub mod tree;

// Re-export all public types at crate root for convenience.
pub use ids::{CommentId, PostId};
pub use structs::{Comment, MAX_COMMENT_LEN, NewComment, NewPost, Post, now};
pub use tree::{build_comment_tree, flatten_comment_tree};
