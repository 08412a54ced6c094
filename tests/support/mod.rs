#![allow(dead_code)]
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use policy_collab::auth::auth::Actor;
use policy_collab::db::memstore::MemStore;
use policy_collab::db::store::CollabStore;
use policy_collab::models::messages::ServerMessage;
use policy_collab::services::comment_service::CommentService;
use policy_collab::services::version_service::VersionService;
use policy_collab::ws::registry::ConnectionRegistry;
use policy_collab::ws::session::SessionHub;

pub const ORG: &str = "acme";

pub struct TestApp {
    pub store: Arc<MemStore>,
    pub hub: Arc<SessionHub>,
    pub comments: Arc<CommentService>,
    pub versions: Arc<VersionService>,
}

/// Build the full collaboration core against a fresh in-memory store with
/// one registered document, returned alongside the app.
pub async fn test_app() -> (TestApp, Uuid) {
    let store = Arc::new(MemStore::new());
    let document_id = Uuid::new_v4();
    store.register_document(document_id).await;

    let dyn_store: Arc<dyn CollabStore> = store.clone();
    let registry = Arc::new(ConnectionRegistry::new());
    let versions = VersionService::new(dyn_store.clone());
    let comments = CommentService::new(dyn_store.clone());
    let hub = SessionHub::new(registry, dyn_store, versions.clone());

    (
        TestApp {
            store,
            hub,
            comments,
            versions,
        },
        document_id,
    )
}

pub fn member(user_id: &str) -> Actor {
    Actor {
        user_id: user_id.to_string(),
        org_id: ORG.to_string(),
        display_name: format!("User {user_id}"),
        prpls: vec![format!("{ORG}/u/{user_id}")],
    }
}

pub fn admin(user_id: &str) -> Actor {
    let mut actor = member(user_id);
    actor.prpls.push("r/Admin".to_string());
    actor
}

pub fn cloud_admin(user_id: &str) -> Actor {
    let mut actor = member(user_id);
    actor.prpls.push("r/CloudAdmin".to_string());
    actor
}

/// Join a user into a document's session, returning the joined frame, the
/// connection id and the receiving end of the outbound frame queue.
pub async fn join(
    hub: &Arc<SessionHub>,
    actor: &Actor,
    document_id: Uuid,
) -> (
    policy_collab::models::messages::JoinedMessage,
    Uuid,
    mpsc::UnboundedReceiver<ServerMessage>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_id = Uuid::new_v4();
    let joined = hub
        .join(actor, document_id, &actor.display_name, connection_id, tx)
        .await
        .expect("join should succeed");
    (joined, connection_id, rx)
}

/// Drain every frame currently queued on a connection
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}
