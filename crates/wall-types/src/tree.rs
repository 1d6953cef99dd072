//! Comment-tree reconstruction.
//!
//! [`build_comment_tree`] turns a flat comment listing (one post, any
//! order) into the list of top-level comments with nested `replies`.
//! Both storage backends feed their flat listings through it.
//!
//! A comment whose `parent_id` names an id absent from the input is
//! dropped, together with its own descendants. It is neither promoted to
//! top level nor reported as an error.
//!
//! Siblings (and the top-level list) are ordered by `(created_at, id)`.

use std::collections::{BTreeMap, HashSet};

use crate::ids::CommentId;
use crate::structs::Comment;

/// Build the reply tree for one post's comments.
///
/// Any `replies` already present on the inputs are discarded; the tree is
/// derived solely from `parent_id` links.
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<Comment> {
    let known: HashSet<CommentId> = comments.iter().map(|c| c.id).collect();

    let mut roots = Vec::new();
    let mut children: BTreeMap<CommentId, Vec<Comment>> = BTreeMap::new();

    for mut comment in comments {
        comment.replies = Vec::new();
        match comment.parent_id {
            None => roots.push(comment),
            Some(parent) if known.contains(&parent) => {
                children.entry(parent).or_default().push(comment);
            }
            Some(_) => {}
        }
    }

    roots.sort_by_key(Comment::sort_key);
    for siblings in children.values_mut() {
        siblings.sort_by_key(Comment::sort_key);
    }

    roots
        .into_iter()
        .map(|root| attach_replies(root, &mut children))
        .collect()
}

/// Recursively move `comment`'s children out of the lookup and attach them.
fn attach_replies(
    mut comment: Comment,
    children: &mut BTreeMap<CommentId, Vec<Comment>>,
) -> Comment {
    if let Some(direct) = children.remove(&comment.id) {
        comment.replies = direct
            .into_iter()
            .map(|child| attach_replies(child, children))
            .collect();
    }
    comment
}

/// Flatten a tree back into a listing, parents before children.
pub fn flatten_comment_tree(tree: &[Comment]) -> Vec<Comment> {
    let mut flat = Vec::new();
    let mut stack: Vec<&Comment> = tree.iter().rev().collect();
    while let Some(node) = stack.pop() {
        let mut copy = node.clone();
        copy.replies = Vec::new();
        flat.push(copy);
        stack.extend(node.replies.iter().rev());
    }
    flat
}

#[cfg(test)]
mod tests {
    #![allow(clippy::arithmetic_side_effects)]

    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::ids::PostId;

    fn comment(post: PostId, parent: Option<CommentId>, second: i64) -> Comment {
        let at = Utc
            .timestamp_opt(1_700_000_000, 0)
            .single()
            .unwrap_or_default()
            + Duration::seconds(second);
        Comment {
            id: CommentId::new(),
            post_id: post,
            parent_id: parent,
            content: format!("comment at {second}"),
            created_at: at,
            updated_at: at,
            replies: Vec::new(),
        }
    }

    #[test]
    fn builds_chain_and_drops_orphans() {
        let post = PostId::new();
        let a = comment(post, None, 0);
        let b = comment(post, Some(a.id), 1);
        let c = comment(post, Some(b.id), 2);
        let d = comment(post, Some(CommentId::new()), 3);
        let (a_id, b_id, c_id, d_id) = (a.id, b.id, c.id, d.id);

        // Scrambled input order.
        let tree = build_comment_tree(vec![c, d, a, b]);

        assert_eq!(tree.len(), 1);
        let root = tree.first();
        assert_eq!(root.map(|r| r.id), Some(a_id));
        let b_node = root.and_then(|r| r.replies.first());
        assert_eq!(b_node.map(|n| n.id), Some(b_id));
        let c_node = b_node.and_then(|n| n.replies.first());
        assert_eq!(c_node.map(|n| n.id), Some(c_id));
        assert!(c_node.is_some_and(|n| n.replies.is_empty()));

        let everywhere = flatten_comment_tree(&tree);
        assert_eq!(everywhere.len(), 3);
        assert!(everywhere.iter().all(|n| n.id != d_id));
    }

    #[test]
    fn descendants_of_orphans_are_dropped_too() {
        let post = PostId::new();
        let orphan = comment(post, Some(CommentId::new()), 0);
        let child = comment(post, Some(orphan.id), 1);
        let tree = build_comment_tree(vec![orphan, child]);
        assert!(tree.is_empty());
    }

    #[test]
    fn siblings_are_ordered_by_creation() {
        let post = PostId::new();
        let root = comment(post, None, 0);
        let late = comment(post, Some(root.id), 9);
        let early = comment(post, Some(root.id), 1);
        let second_root = comment(post, None, 5);
        let (early_id, late_id, root_id, second_id) = (early.id, late.id, root.id, second_root.id);

        let tree = build_comment_tree(vec![late, second_root, early, root]);

        let top: Vec<CommentId> = tree.iter().map(|c| c.id).collect();
        assert_eq!(top, vec![root_id, second_id]);
        let replies: Vec<CommentId> = tree
            .first()
            .map(|r| r.replies.iter().map(|c| c.id).collect())
            .unwrap_or_default();
        assert_eq!(replies, vec![early_id, late_id]);
    }

    #[test]
    fn stale_embedded_replies_are_replaced() {
        let post = PostId::new();
        let mut root = comment(post, None, 0);
        root.replies.push(comment(post, Some(root.id), 1));
        let tree = build_comment_tree(vec![root]);
        assert!(tree.first().is_some_and(|r| r.replies.is_empty()));
    }

    #[test]
    fn empty_input_gives_empty_tree() {
        assert!(build_comment_tree(Vec::new()).is_empty());
    }

    #[test]
    fn self_parented_comment_is_unreachable() {
        let post = PostId::new();
        let mut looped = comment(post, None, 0);
        looped.parent_id = Some(looped.id);
        assert!(build_comment_tree(vec![looped]).is_empty());
    }
}
