//! Behavior every [`Repository`] must share, run against each backend.

use wall_db::{DbError, Repository};
use wall_types::{CommentId, NewComment, NewPost, PostId};

/// Run every contract check against `repo`.
pub async fn run_contract(repo: &dyn Repository) {
    post_round_trip(repo).await;
    invalid_input_never_reaches_storage(repo).await;
    missing_records_are_not_found(repo).await;
    closed_post_rejects_comments(repo).await;
    reply_chain_builds_tree(repo).await;
    pagination_slices_listing(repo).await;
    posts_listed_oldest_first(repo).await;
}

async fn open_post(repo: &dyn Repository, title: &str) -> PostId {
    repo.create_post(NewPost::new(title, "body", true))
        .await
        .expect("create post")
        .id
}

async fn post_round_trip(repo: &dyn Repository) {
    let id = PostId::new();
    let created = repo
        .create_post(NewPost::new("Hello", "World", true).with_id(id))
        .await
        .expect("create post");
    assert_eq!(created.id, id);
    assert_eq!(created.created_at, created.updated_at);

    let fetched = repo.get_post_by_id(id).await.expect("get post");
    assert_eq!(fetched, created);
    assert!(fetched.comments.is_empty());

    let comments = repo.get_comments_for_post(id).await.expect("list comments");
    assert!(comments.is_empty());

    let dup = repo
        .create_post(NewPost::new("Again", "World", true).with_id(id))
        .await;
    assert!(matches!(dup, Err(DbError::AlreadyExists { entity: "post", .. })));
}

async fn invalid_input_never_reaches_storage(repo: &dyn Repository) {
    let result = repo.create_post(NewPost::new("", "body", true)).await;
    assert!(matches!(result, Err(DbError::Validation(_))));

    let post = open_post(repo, "validation").await;
    let result = repo.create_comment(NewComment::new(post, "")).await;
    assert!(matches!(result, Err(DbError::Validation(_))));
    let result = repo
        .create_comment(NewComment::new(post, "x".repeat(2001)))
        .await;
    assert!(matches!(result, Err(DbError::Validation(_))));
    let ok = repo
        .create_comment(NewComment::new(post, "x".repeat(2000)))
        .await;
    assert!(ok.is_ok());
}

async fn missing_records_are_not_found(repo: &dyn Repository) {
    let result = repo.get_post_by_id(PostId::new()).await;
    assert!(matches!(result, Err(DbError::NotFound { entity: "post", .. })));

    let result = repo.get_comment_by_id(CommentId::new()).await;
    assert!(matches!(result, Err(DbError::NotFound { entity: "comment", .. })));

    let result = repo
        .create_comment(NewComment::new(PostId::new(), "orphan"))
        .await;
    assert!(matches!(result, Err(DbError::NotFound { entity: "post", .. })));
}

async fn closed_post_rejects_comments(repo: &dyn Repository) {
    let post = repo
        .create_post(NewPost::new("Closed", "No comments", false))
        .await
        .expect("create closed post");
    assert!(!post.comments_active);

    let result = repo.create_comment(NewComment::new(post.id, "hi")).await;
    assert!(matches!(result, Err(DbError::CommentsDisabled(id)) if id == post.id));
    assert!(
        repo.get_comments_for_post(post.id)
            .await
            .expect("list comments")
            .is_empty()
    );
}

async fn reply_chain_builds_tree(repo: &dyn Repository) {
    let post = open_post(repo, "thread").await;
    let a = repo
        .create_comment(NewComment::new(post, "A"))
        .await
        .expect("create A");
    let b = repo
        .create_comment(NewComment::new(post, "B").reply_to(a.id))
        .await
        .expect("create B");
    let c = repo
        .create_comment(NewComment::new(post, "C").reply_to(b.id))
        .await
        .expect("create C");

    let fetched = repo.get_comment_by_id(c.id).await.expect("get C");
    assert_eq!(fetched.content, "C");
    assert_eq!(fetched.parent_id, Some(b.id));
    assert_eq!(fetched.post_id, post);

    let tree = repo.get_post_by_id(post).await.expect("get post").comments;
    assert_eq!(tree.len(), 1);
    let root = &tree[0];
    assert_eq!(root.id, a.id);
    assert_eq!(root.replies.len(), 1);
    assert_eq!(root.replies[0].id, b.id);
    assert_eq!(root.replies[0].replies.len(), 1);
    assert_eq!(root.replies[0].replies[0].id, c.id);

    let flat = repo.get_comments_for_post(post).await.expect("list comments");
    let ids: Vec<CommentId> = flat.iter().map(|comment| comment.id).collect();
    assert_eq!(ids, vec![a.id, b.id, c.id]);

    let parent = repo.get_comment_by_id(a.id).await.expect("get A");
    assert_eq!(parent.replies.len(), 1);
    assert_eq!(parent.replies[0].id, b.id);
}

async fn pagination_slices_listing(repo: &dyn Repository) {
    let post = open_post(repo, "paged").await;
    for n in 0..5 {
        repo.create_comment(NewComment::new(post, format!("comment {n}")))
            .await
            .expect("create comment");
    }
    let full = repo.get_comments_for_post(post).await.expect("list comments");
    assert_eq!(full.len(), 5);

    for (limit, offset) in [(2_u32, 0_u32), (2, 1), (3, 4), (10, 0), (1, 5), (4, 9), (0, 2)] {
        let page = repo
            .get_comments_for_post_paginated(post, Some(limit), Some(offset))
            .await
            .expect("page");
        let start = usize::try_from(offset).expect("offset").min(full.len());
        let end = start
            .saturating_add(usize::try_from(limit).expect("limit"))
            .min(full.len());
        assert_eq!(page, full[start..end].to_vec(), "limit {limit} offset {offset}");
    }

    let unpaged = repo
        .get_comments_for_post_paginated(post, Some(2), None)
        .await
        .expect("limit only");
    assert_eq!(unpaged, full);
    let unpaged = repo
        .get_comments_for_post_paginated(post, None, None)
        .await
        .expect("no bounds");
    assert_eq!(unpaged, full);
}

// The legacy comparator was `a.updated_at < b.created_at`; `(created_at, id)`
// ascending is our reading of it and still needs confirming by the product owner.
async fn posts_listed_oldest_first(repo: &dyn Repository) {
    let first = open_post(repo, "first").await;
    let second = open_post(repo, "second").await;
    let posts = repo.get_posts().await.expect("list posts");

    assert!(
        posts
            .windows(2)
            .all(|w| (w[0].created_at, w[0].id) <= (w[1].created_at, w[1].id))
    );
    let position = |id: PostId| posts.iter().position(|post| post.id == id);
    assert!(position(first) < position(second));
    assert!(position(first).is_some());
}
