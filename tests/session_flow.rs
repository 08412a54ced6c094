mod support;

use chrono::{Duration, Utc};
use policy_collab::models::messages::ServerMessage;
use policy_collab::models::{CollabError, CursorPosition, PresenceStatus};
use support::{drain, join, member, test_app};
use uuid::Uuid;

#[tokio::test]
async fn two_users_share_one_session_per_document() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let bob = member("bob");

    let (joined_a, _conn_a, mut rx_a) = join(&app.hub, &alice, document_id).await;
    let (joined_b, _conn_b, mut rx_b) = join(&app.hub, &bob, document_id).await;

    assert_eq!(joined_a.session_id, joined_b.session_id);
    assert_eq!(joined_a.participants.len(), 1);
    assert_eq!(joined_b.participants.len(), 2);

    // Alice is told about Bob; Bob receives no echo of his own join
    let frames_a = drain(&mut rx_a);
    assert!(frames_a.iter().any(
        |f| matches!(f, ServerMessage::UserJoined(m) if m.user_id == "bob")
    ));
    assert!(drain(&mut rx_b).is_empty());
}

#[tokio::test]
async fn join_rejects_unknown_document() {
    let (app, _document_id) = test_app().await;
    let alice = member("alice");
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

    let err = app
        .hub
        .join(&alice, Uuid::new_v4(), "Alice", Uuid::new_v4(), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::DocumentNotFound(_)));
}

#[tokio::test]
async fn cursor_updates_reach_everyone_but_the_originator() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let bob = member("bob");

    let (joined, _conn_a, mut rx_a) = join(&app.hub, &alice, document_id).await;
    let (_, _conn_b, mut rx_b) = join(&app.hub, &bob, document_id).await;
    drain(&mut rx_a);

    app.hub
        .cursor_move(
            joined.session_id,
            "alice",
            CursorPosition { line: 3, column: 7 },
        )
        .await
        .unwrap();

    let frames_b = drain(&mut rx_b);
    match frames_b.as_slice() {
        [ServerMessage::CursorMove(m)] => {
            assert_eq!(m.user_id, "alice");
            assert_eq!(m.position.line, 3);
            assert_eq!(m.position.column, 7);
        }
        other => panic!("expected one cursor frame, got {:?}", other),
    }
    assert!(drain(&mut rx_a).is_empty());
}

#[tokio::test]
async fn cursor_from_non_participant_is_rejected() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let (joined, _conn, _rx) = join(&app.hub, &alice, document_id).await;

    let err = app
        .hub
        .cursor_move(
            joined.session_id,
            "mallory",
            CursorPosition { line: 0, column: 0 },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CollabError::BadRequest(_)));
}

#[tokio::test]
async fn leave_announces_and_removes_the_participant() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let bob = member("bob");

    let (joined, _conn_a, mut rx_a) = join(&app.hub, &alice, document_id).await;
    let (_, conn_b, _rx_b) = join(&app.hub, &bob, document_id).await;
    drain(&mut rx_a);

    app.hub.leave(joined.session_id, "bob", conn_b).await;

    let frames_a = drain(&mut rx_a);
    assert!(frames_a.iter().any(
        |f| matches!(f, ServerMessage::UserLeft(m) if m.user_id == "bob")
    ));
    assert_eq!(app.hub.participant_count(document_id).await, Some(1));
}

#[tokio::test]
async fn reconnect_keeps_one_participant_and_stays_silent() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let bob = member("bob");

    let (_, _conn_a1, mut rx_a1) = join(&app.hub, &alice, document_id).await;
    let (_, _conn_b, mut rx_b) = join(&app.hub, &bob, document_id).await;
    drain(&mut rx_a1);
    drain(&mut rx_b);

    // Alice opens a second connection (tab refresh)
    let (joined_a2, _conn_a2, _rx_a2) = join(&app.hub, &alice, document_id).await;
    assert_eq!(joined_a2.participants.len(), 2);
    assert_eq!(app.hub.participant_count(document_id).await, Some(2));

    // No duplicate user_joined goes out
    assert!(drain(&mut rx_b).is_empty());
}

#[tokio::test(start_paused = true)]
async fn empty_session_is_evicted_after_the_grace_period() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");

    let (joined, conn_a, _rx_a) = join(&app.hub, &alice, document_id).await;
    app.hub.leave(joined.session_id, "alice", conn_a).await;
    assert!(app.hub.live_session_id(document_id).await.is_some());

    tokio::time::sleep(std::time::Duration::from_secs(
        policy_collab::ws::session::IDLE_EVICTION_GRACE_SECS + 1,
    ))
    .await;

    assert!(app.hub.live_session_id(document_id).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn rejoin_within_the_grace_period_cancels_eviction() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");

    let (joined, conn_a, _rx_a) = join(&app.hub, &alice, document_id).await;
    app.hub.leave(joined.session_id, "alice", conn_a).await;

    // Come back before the eviction fires
    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    let (rejoined, _conn_a2, _rx_a2) = join(&app.hub, &alice, document_id).await;
    assert_eq!(rejoined.session_id, joined.session_id);

    tokio::time::sleep(std::time::Duration::from_secs(
        policy_collab::ws::session::IDLE_EVICTION_GRACE_SECS + 5,
    ))
    .await;

    assert_eq!(
        app.hub.live_session_id(document_id).await,
        Some(joined.session_id)
    );
    assert_eq!(app.hub.participant_count(document_id).await, Some(1));
}

#[tokio::test]
async fn text_changes_relay_without_persisting_each_keystroke() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let bob = member("bob");

    let (joined, _conn_a, mut rx_a) = join(&app.hub, &alice, document_id).await;
    let (_, _conn_b, mut rx_b) = join(&app.hub, &bob, document_id).await;
    drain(&mut rx_a);

    app.hub
        .publish_change(
            joined.session_id,
            &alice,
            "insert",
            serde_json::json!({"at": 0, "text": "H"}),
            None,
        )
        .await
        .unwrap();

    let frames_b = drain(&mut rx_b);
    assert!(frames_b.iter().any(
        |f| matches!(f, ServerMessage::TextChange(m) if m.user_id == "alice" && m.change_type == "insert")
    ));
    assert!(drain(&mut rx_a).is_empty());

    // A single change never produces a version record
    let (_, total) = app.versions.list(document_id, 1, 50).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn snapshot_cadence_fires_on_the_change_threshold() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let (joined, _conn_a, _rx_a) = join(&app.hub, &alice, document_id).await;

    let threshold = policy_collab::ws::session::SNAPSHOT_CHANGE_THRESHOLD;
    for i in 1..threshold {
        app.hub
            .publish_change(
                joined.session_id,
                &alice,
                "insert",
                serde_json::json!({"seq": i}),
                None,
            )
            .await
            .unwrap();
    }
    let (_, total) = app.versions.list(document_id, 1, 50).await.unwrap();
    assert_eq!(total, 0);

    // The triggering change carries the full content
    app.hub
        .publish_change(
            joined.session_id,
            &alice,
            "insert",
            serde_json::json!({"seq": threshold}),
            Some("full document text".to_string()),
        )
        .await
        .unwrap();

    // The snapshot happens after the broadcast, same task
    let (summaries, total) = app.versions.list(document_id, 1, 50).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(summaries[0].version_number, 1);
    assert_eq!(summaries[0].created_by, "alice");
}

#[tokio::test]
async fn typing_flips_presence_to_editing() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let bob = member("bob");

    let (joined, _conn_a, _rx_a) = join(&app.hub, &alice, document_id).await;
    let (_, _conn_b, mut rx_b) = join(&app.hub, &bob, document_id).await;

    app.hub
        .typing(joined.session_id, "alice", true)
        .await
        .unwrap();
    let frames_b = drain(&mut rx_b);
    assert!(frames_b.iter().any(
        |f| matches!(f, ServerMessage::TypingStart(m) if m.user_id == "alice")
    ));

    // A rejoin snapshot of the roster shows Alice as editing
    let (roster, _conn_b2, _rx_b2) = join(&app.hub, &bob, document_id).await;
    let alice_info = roster
        .participants
        .iter()
        .find(|p| p.user_id == "alice")
        .unwrap();
    assert_eq!(alice_info.status, PresenceStatus::Editing);
}

#[tokio::test]
async fn sweep_broadcasts_presence_once_per_transition() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let bob = member("bob");

    let (joined, _conn_a, _rx_a) = join(&app.hub, &alice, document_id).await;
    let (_, _conn_b, mut rx_b) = join(&app.hub, &bob, document_id).await;

    app.hub
        .typing(joined.session_id, "alice", true)
        .await
        .unwrap();
    drain(&mut rx_b);

    // First sweep sees Alice go Active -> Editing and announces it
    assert!(app.hub.sweep(document_id).await);
    let frames_b = drain(&mut rx_b);
    assert!(frames_b.iter().any(|f| matches!(
        f,
        ServerMessage::PresenceUpdate(m)
            if m.user_id == "alice" && m.status == PresenceStatus::Editing
    )));

    // No status changed since, so the next sweep stays silent
    assert!(app.hub.sweep(document_id).await);
    let frames_b = drain(&mut rx_b);
    assert!(!frames_b
        .iter()
        .any(|f| matches!(f, ServerMessage::PresenceUpdate(_))));
}

#[tokio::test]
async fn missed_heartbeats_are_reaped_as_leaves() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let bob = member("bob");

    let (joined, _conn_a, mut rx_a) = join(&app.hub, &alice, document_id).await;
    let (_, conn_b, _rx_b) = join(&app.hub, &bob, document_id).await;
    drain(&mut rx_a);

    // Bob's connection goes silent past the heartbeat window
    app.hub
        .registry()
        .touch(
            conn_b,
            Utc::now()
                - Duration::seconds(policy_collab::ws::registry::HEARTBEAT_TIMEOUT_SECS + 10),
        )
        .await;

    assert!(app.hub.sweep(document_id).await);

    assert_eq!(app.hub.participant_count(document_id).await, Some(1));
    let frames_a = drain(&mut rx_a);
    assert!(frames_a.iter().any(
        |f| matches!(f, ServerMessage::UserLeft(m) if m.user_id == "bob")
    ));
    assert_eq!(
        app.hub
            .registry()
            .session_connection_count(joined.session_id)
            .await,
        1
    );
}

#[tokio::test]
async fn comment_broadcast_reaches_every_participant() {
    let (app, document_id) = test_app().await;
    let alice = member("alice");
    let bob = member("bob");

    let (_, _conn_a, mut rx_a) = join(&app.hub, &alice, document_id).await;
    let (_, _conn_b, mut rx_b) = join(&app.hub, &bob, document_id).await;
    drain(&mut rx_a);

    let comment = app
        .comments
        .add_comment(
            &alice,
            document_id,
            "Should we tighten this clause?".to_string(),
            None,
            serde_json::json!({"line": 12}),
            policy_collab::models::CommentType::Question,
        )
        .await
        .unwrap();
    app.hub.broadcast_comment_added(&comment).await;

    for rx in [&mut rx_a, &mut rx_b] {
        let frames = drain(rx);
        assert!(frames.iter().any(|f| matches!(
            f,
            ServerMessage::CommentAdded(m) if m.comment.comment_id == comment.comment_id
        )));
    }
}

#[tokio::test]
async fn diagnostics_counts_sessions_participants_and_connections() {
    let (app, document_id) = test_app().await;
    let second_doc = Uuid::new_v4();
    app.store.register_document(second_doc).await;

    let alice = member("alice");
    let bob = member("bob");
    let (_, _c1, _r1) = join(&app.hub, &alice, document_id).await;
    let (_, _c2, _r2) = join(&app.hub, &bob, document_id).await;
    let (_, _c3, _r3) = join(&app.hub, &alice, second_doc).await;

    let (n_sessions, n_participants, n_connections) = app.hub.diagnostics().await;
    assert_eq!(n_sessions, 2);
    assert_eq!(n_participants, 3);
    assert_eq!(n_connections, 3);
}

#[tokio::test]
async fn diagnostics_handler_rejects_org_admins() {
    use axum::extract::{Extension, State};
    use axum::http::StatusCode;
    use policy_collab::handlers::diagnostics::diagnostics;
    use policy_collab::AppState;
    use std::sync::Arc;
    use support::{admin, cloud_admin};

    let (app, document_id) = test_app().await;
    let (_, _c1, _r1) = join(&app.hub, &member("alice"), document_id).await;

    let state = Arc::new(AppState {
        hub: app.hub.clone(),
        comments: app.comments.clone(),
        versions: app.versions.clone(),
    });

    // An org admin is not a cloud admin
    let Err((status, _)) = diagnostics(State(state.clone()), Extension(admin("boss"))).await
    else {
        panic!("org admin should be rejected");
    };
    assert_eq!(status, StatusCode::FORBIDDEN);

    let Ok((status, body)) = diagnostics(State(state), Extension(cloud_admin("ops"))).await
    else {
        panic!("cloud admin should see counters");
    };
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.n_participants, 1);
}
