mod support;

use chrono::{Duration, Utc};
use policy_collab::db::store::CommentStore;
use policy_collab::models::{
    CollabError, Comment, CommentStatus, CommentType,
};
use support::{admin, member, test_app};
use uuid::Uuid;

async fn quick_comment(
    app: &support::TestApp,
    document_id: Uuid,
    author: &policy_collab::auth::auth::Actor,
    body: &str,
) -> Comment {
    app.comments
        .add_comment(
            author,
            document_id,
            body.to_string(),
            None,
            serde_json::json!({"line": 1}),
            CommentType::General,
        )
        .await
        .expect("comment creation should succeed")
}

#[tokio::test]
async fn mentions_are_extracted_at_creation() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");

    let comment = quick_comment(
        &app,
        document_id,
        &alice,
        "Looping in @[Bob](u42) and @[Ann](u7), also @[Bob](u42) again",
    )
    .await;

    assert_eq!(comment.mentioned_user_ids, vec!["u42", "u7"]);
    assert_eq!(comment.status, CommentStatus::Open);
    assert!(!comment.pinned);
    assert_eq!(
        comment.editable_until,
        Comment::editable_until_from(comment.created_at)
    );
}

#[tokio::test]
async fn comment_on_unknown_document_is_rejected() {
    let (app, _document_id) = test_app().await;
    let alice = member("alice");

    let err = app
        .comments
        .add_comment(
            &alice,
            Uuid::new_v4(),
            "orphan".to_string(),
            None,
            serde_json::Value::Null,
            CommentType::General,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::DocumentNotFound(_)));
}

#[tokio::test]
async fn only_the_author_may_edit() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let bob = member("bob");
    let boss = admin("boss");

    let comment = quick_comment(&app, document_id, &alice, "draft wording").await;

    let err = app
        .comments
        .edit_comment(&bob, comment.comment_id, "hijacked".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::NotAuthor));

    // Admin rights make no difference for editing
    let err = app
        .comments
        .edit_comment(&boss, comment.comment_id, "hijacked".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::NotAuthor));

    let edited = app
        .comments
        .edit_comment(&alice, comment.comment_id, "final wording".to_string())
        .await
        .unwrap();
    assert_eq!(edited.body, "final wording");
    // The mention list stays as derived at creation
    assert!(edited.mentioned_user_ids.is_empty());
}

#[tokio::test]
async fn edit_window_expires() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");

    // A comment created beyond the edit window, as an old row would be
    let created_at = Utc::now() - Duration::minutes(16);
    let stale = Comment {
        comment_id: Uuid::new_v4(),
        document_id,
        org_id: support::ORG.to_string(),
        parent_comment_id: None,
        author_id: "alice".to_string(),
        body: "old remark".to_string(),
        mentioned_user_ids: vec![],
        comment_type: CommentType::General,
        position_selector: serde_json::Value::Null,
        status: CommentStatus::Open,
        pinned: false,
        created_at,
        editable_until: Comment::editable_until_from(created_at),
        deleted_at: None,
    };
    app.store.insert_comment(&stale).await.unwrap();

    let err = app
        .comments
        .edit_comment(&alice, stale.comment_id, "too late".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::EditWindowExpired));
}

#[tokio::test]
async fn any_member_may_resolve_and_reopen() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let bob = member("bob");

    let parent = quick_comment(&app, document_id, &alice, "open point").await;
    let reply = app
        .comments
        .add_comment(
            &bob,
            document_id,
            "agreed".to_string(),
            Some(parent.comment_id),
            serde_json::Value::Null,
            CommentType::General,
        )
        .await
        .unwrap();

    let resolved = app.comments.resolve(&bob, parent.comment_id).await.unwrap();
    assert_eq!(resolved.status, CommentStatus::Resolved);

    // Resolution does not cascade to replies
    let threads = app.comments.list_threads(document_id).await.unwrap();
    let thread = &threads[0];
    assert_eq!(thread.comment.status, CommentStatus::Resolved);
    assert_eq!(thread.replies[0].comment_id, reply.comment_id);
    assert_eq!(thread.replies[0].status, CommentStatus::Open);

    let reopened = app.comments.reopen(&alice, parent.comment_id).await.unwrap();
    assert_eq!(reopened.status, CommentStatus::Open);
}

#[tokio::test]
async fn replies_must_reference_a_live_comment_in_the_same_document() {
    let (app, document_id) = test_app().await;
    let other_doc = Uuid::new_v4();
    app.store.register_document(other_doc).await;
    let alice = member("alice");

    let parent = quick_comment(&app, document_id, &alice, "root").await;

    // Wrong document
    let err = app
        .comments
        .add_comment(
            &alice,
            other_doc,
            "misplaced".to_string(),
            Some(parent.comment_id),
            serde_json::Value::Null,
            CommentType::General,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::CommentNotFound(_)));

    // Deleted parent
    app.comments.delete(&alice, parent.comment_id).await.unwrap();
    let err = app
        .comments
        .add_comment(
            &alice,
            document_id,
            "late reply".to_string(),
            Some(parent.comment_id),
            serde_json::Value::Null,
            CommentType::General,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::CommentNotFound(_)));
}

#[tokio::test]
async fn delete_is_author_or_admin_only_and_soft() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let bob = member("bob");
    let boss = admin("boss");

    let first = quick_comment(&app, document_id, &alice, "first").await;
    let second = quick_comment(&app, document_id, &alice, "second").await;

    let err = app.comments.delete(&bob, first.comment_id).await.unwrap_err();
    assert!(matches!(err, CollabError::InsufficientRole));

    app.comments.delete(&boss, first.comment_id).await.unwrap();
    app.comments.delete(&alice, second.comment_id).await.unwrap();

    // Soft-deleted comments vanish from listings but stay addressable errors
    let threads = app.comments.list_threads(document_id).await.unwrap();
    assert!(threads.is_empty());

    let err = app
        .comments
        .edit_comment(&alice, first.comment_id, "ghost".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::CommentNotFound(_)));
}

#[tokio::test]
async fn threads_list_pinned_first_then_oldest() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");

    let a = quick_comment(&app, document_id, &alice, "a").await;
    let b = quick_comment(&app, document_id, &alice, "b").await;
    let c = quick_comment(&app, document_id, &alice, "c").await;

    let pinned = app.comments.pin(&alice, c.comment_id).await.unwrap();
    assert!(pinned.pinned);

    let threads = app.comments.list_threads(document_id).await.unwrap();
    let order: Vec<Uuid> = threads.iter().map(|t| t.comment.comment_id).collect();
    assert_eq!(order, vec![c.comment_id, a.comment_id, b.comment_id]);

    // Pinning toggles off again
    let unpinned = app.comments.pin(&alice, c.comment_id).await.unwrap();
    assert!(!unpinned.pinned);
}
