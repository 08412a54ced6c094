use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::auth::Actor;
use crate::db::store::CollabStore;
use crate::models::messages::{
    CursorBroadcastMessage, DocumentUpdatedMessage, JoinedMessage, PresenceUpdateMessage,
    ServerMessage, TextChangeBroadcastMessage, TypingBroadcastMessage, UserJoinedMessage,
    UserLeftMessage,
};
use crate::models::{
    color_for_user, CollabError, Comment, CursorPosition, ParticipantInfo, PresenceStatus,
};
use crate::services::version_service::VersionService;
use crate::ws::presence::{self, EDITING_QUIET_SECS, SWEEP_PERIOD_SECS};
use crate::ws::registry::{Connection, ConnectionRegistry};

/// Grace period after the last participant leaves before the session and its
/// in-memory state are discarded. Tolerates network blips and tab refreshes.
pub const IDLE_EVICTION_GRACE_SECS: u64 = 30;

/// Snapshot cadence: a snapshot is triggered every this many broadcast
/// changes, or after the interval below, whichever comes first. Never per
/// keystroke.
pub const SNAPSHOT_CHANGE_THRESHOLD: u32 = 20;
pub const SNAPSHOT_INTERVAL_SECS: i64 = 30;

/// A user's membership in a live session. One record per (session, user);
/// simultaneous connections from the same user reuse it and only the most
/// recent connection id is kept.
#[derive(Debug)]
pub struct Participant {
    pub user_id: String,
    pub display_name: String,
    pub color: String,
    /// Owned by the transport layer, never persisted
    pub connection_id: Uuid,
    pub last_activity_at: DateTime<Utc>,
    /// Live end of the transient `editing` presence override
    pub editing_until: Option<DateTime<Utc>>,
    /// Ephemeral, overwritten on every update, never queued
    pub cursor: Option<CursorPosition>,
    /// Last status emitted in a presence_update, for no-op suppression
    pub last_broadcast_status: PresenceStatus,
}

impl Participant {
    pub fn info(&self, now: DateTime<Utc>) -> ParticipantInfo {
        ParticipantInfo {
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            status: presence::derive_status(self.last_activity_at, self.editing_until, now),
            cursor_position: self.cursor,
            color: self.color.clone(),
            last_activity_at: self.last_activity_at,
        }
    }
}

/// One document under active collaboration
pub struct Session {
    pub session_id: Uuid,
    pub document_id: Uuid,
    pub org_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub participants: HashMap<String, Participant>,
    changes_since_snapshot: u32,
    last_snapshot_trigger: DateTime<Utc>,
    /// Bumped on every membership transition; a pending eviction only fires
    /// if the epoch it captured is still current.
    eviction_epoch: u64,
}

#[derive(Default)]
struct HubInner {
    by_document: HashMap<Uuid, Session>,
    by_session_id: HashMap<Uuid, Uuid>,
}

/// Orchestrates session lifecycle (join/leave/reconnect/idle eviction) and
/// relays every broadcast through the connection registry.
///
/// All session state is mutated under one mutex; broadcasts happen inside
/// the locked section so the fan-out order matches server receipt order
/// (FIFO per session). Lock order is always hub then registry.
pub struct SessionHub {
    inner: Mutex<HubInner>,
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn CollabStore>,
    versions: Arc<VersionService>,
}

impl SessionHub {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn CollabStore>,
        versions: Arc<VersionService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(HubInner::default()),
            registry,
            store,
            versions,
        })
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Join a document's live session, creating the session if none exists.
    ///
    /// A user who already holds a participant record is treated as a
    /// reconnect: the new connection is re-associated, any pending idle
    /// eviction is cancelled, and no duplicate `user_joined` is emitted.
    /// Returns the full participant list so the joining client renders
    /// existing presence without a race.
    pub async fn join(
        self: &Arc<Self>,
        actor: &Actor,
        document_id: Uuid,
        display_name: &str,
        connection_id: Uuid,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<JoinedMessage, CollabError> {
        let exists = self
            .store
            .document_exists(document_id)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?;
        if !exists {
            return Err(CollabError::DocumentNotFound(document_id.to_string()));
        }

        let now = Utc::now();
        let mut inner = self.inner.lock().await;

        let is_new_session = !inner.by_document.contains_key(&document_id);
        if is_new_session {
            let session = Session {
                session_id: Uuid::new_v4(),
                document_id,
                org_id: actor.org_id.clone(),
                created_at: now,
                last_activity_at: now,
                participants: HashMap::new(),
                changes_since_snapshot: 0,
                last_snapshot_trigger: now,
                eviction_epoch: 0,
            };
            info!(
                "Created session {} for document {}",
                session.session_id, document_id
            );
            inner.by_session_id.insert(session.session_id, document_id);
            inner.by_document.insert(document_id, session);
        }

        // Unwrap is safe: inserted above if absent
        let session = inner.by_document.get_mut(&document_id).unwrap();
        let session_id = session.session_id;
        session.last_activity_at = now;
        // Cancels any pending idle eviction
        session.eviction_epoch += 1;

        let rejoin = session.participants.contains_key(&actor.user_id);
        match session.participants.get_mut(&actor.user_id) {
            Some(participant) => {
                participant.connection_id = connection_id;
                participant.last_activity_at = now;
            }
            None => {
                session.participants.insert(
                    actor.user_id.clone(),
                    Participant {
                        user_id: actor.user_id.clone(),
                        display_name: display_name.to_string(),
                        color: color_for_user(&actor.user_id),
                        connection_id,
                        last_activity_at: now,
                        editing_until: None,
                        cursor: None,
                        last_broadcast_status: PresenceStatus::Active,
                    },
                );
            }
        }

        let participants: Vec<ParticipantInfo> =
            session.participants.values().map(|p| p.info(now)).collect();
        let color = session.participants[&actor.user_id].color.clone();

        self.registry
            .register(Connection {
                connection_id,
                session_id,
                user_id: actor.user_id.clone(),
                sender,
                last_seen: now,
            })
            .await;

        if !rejoin {
            self.registry
                .broadcast(
                    session_id,
                    &ServerMessage::UserJoined(UserJoinedMessage {
                        session_id,
                        user_id: actor.user_id.clone(),
                        display_name: display_name.to_string(),
                        color,
                    }),
                    Some(&actor.user_id),
                )
                .await;
        }

        if is_new_session {
            self.spawn_presence_sweep(document_id);
        }

        Ok(JoinedMessage {
            session_id,
            document_id,
            participants,
        })
    }

    /// Remove a connection; when it was the user's last, remove the
    /// participant and emit `user_left`. When the session empties, arm the
    /// idle eviction timer instead of deleting immediately.
    pub async fn leave(self: &Arc<Self>, session_id: Uuid, user_id: &str, connection_id: Uuid) {
        let mut inner = self.inner.lock().await;

        self.registry.deregister(connection_id).await;

        let Some(document_id) = inner.by_session_id.get(&session_id).copied() else {
            return;
        };
        let Some(session) = inner.by_document.get_mut(&document_id) else {
            return;
        };

        let remaining = self
            .registry
            .user_connection_count(session_id, user_id)
            .await;
        if remaining > 0 {
            // Another connection of the same user is still live
            return;
        }

        if session.participants.remove(user_id).is_some() {
            info!("User {} left session {}", user_id, session_id);
            self.registry
                .broadcast(
                    session_id,
                    &ServerMessage::UserLeft(UserLeftMessage {
                        session_id,
                        user_id: user_id.to_string(),
                    }),
                    Some(user_id),
                )
                .await;
        }

        if session.participants.is_empty() {
            session.eviction_epoch += 1;
            let epoch = session.eviction_epoch;
            drop(inner);
            self.arm_eviction(document_id, epoch);
        }
    }

    fn arm_eviction(self: &Arc<Self>, document_id: Uuid, epoch: u64) {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(IDLE_EVICTION_GRACE_SECS)).await;
            hub.evict_if_stale(document_id, epoch).await;
        });
    }

    /// Tear down an empty session, unless a participant rejoined since the
    /// eviction was armed. Persisted comments and versions are unaffected.
    async fn evict_if_stale(&self, document_id: Uuid, epoch: u64) {
        let mut inner = self.inner.lock().await;
        let Some(session) = inner.by_document.get(&document_id) else {
            return;
        };
        if session.eviction_epoch != epoch || !session.participants.is_empty() {
            return;
        }
        let session_id = session.session_id;
        inner.by_document.remove(&document_id);
        inner.by_session_id.remove(&session_id);
        drop(inner);
        self.registry.drop_session(session_id).await;
        info!(
            "Evicted idle session {} for document {}",
            session_id, document_id
        );
    }

    /// Relay a cursor/selection update to the other participants. The cursor
    /// state is overwritten in place, never queued.
    pub async fn cursor_move(
        &self,
        session_id: Uuid,
        user_id: &str,
        position: CursorPosition,
    ) -> Result<(), CollabError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        let session = resolve_session(&mut inner, session_id)?;

        let participant = session
            .participants
            .get_mut(user_id)
            .ok_or_else(|| CollabError::BadRequest("not a participant of this session".into()))?;
        participant.cursor = Some(position);
        participant.last_activity_at = now;
        session.last_activity_at = now;

        self.registry
            .broadcast(
                session_id,
                &ServerMessage::CursorMove(CursorBroadcastMessage {
                    session_id,
                    user_id: user_id.to_string(),
                    position,
                }),
                Some(user_id),
            )
            .await;
        Ok(())
    }

    /// Relay a document mutation to the other participants, in server
    /// receipt order. The hub is purely a relay: it never applies the change
    /// anywhere. Its only persistence duty is the snapshot cadence trigger.
    pub async fn publish_change(
        &self,
        session_id: Uuid,
        actor: &Actor,
        change_type: &str,
        payload: serde_json::Value,
        content: Option<String>,
    ) -> Result<(), CollabError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        let session = resolve_session(&mut inner, session_id)?;
        let document_id = session.document_id;
        let org_id = session.org_id.clone();

        let participant = session
            .participants
            .get_mut(&actor.user_id)
            .ok_or_else(|| CollabError::BadRequest("not a participant of this session".into()))?;
        participant.last_activity_at = now;
        participant.editing_until = Some(now + Duration::seconds(EDITING_QUIET_SECS));
        session.last_activity_at = now;

        session.changes_since_snapshot += 1;
        let interval_elapsed =
            now - session.last_snapshot_trigger >= Duration::seconds(SNAPSHOT_INTERVAL_SECS);
        let snapshot_due =
            session.changes_since_snapshot >= SNAPSHOT_CHANGE_THRESHOLD || interval_elapsed;
        if snapshot_due {
            session.changes_since_snapshot = 0;
            session.last_snapshot_trigger = now;
        }

        self.registry
            .broadcast(
                session_id,
                &ServerMessage::TextChange(TextChangeBroadcastMessage {
                    session_id,
                    user_id: actor.user_id.clone(),
                    change_type: change_type.to_string(),
                    payload,
                }),
                Some(&actor.user_id),
            )
            .await;
        drop(inner);

        // Cadence snapshot: only when the triggering change carries full
        // content. The hub owns no canonical copy of the document.
        if snapshot_due {
            if let Some(content) = content {
                if let Err(e) = self
                    .versions
                    .create_snapshot(document_id, &org_id, content, &actor.user_id, None)
                    .await
                {
                    error!(
                        "Cadence snapshot failed for document {}: {}",
                        document_id, e
                    );
                }
            }
        }
        Ok(())
    }

    /// Relay a typing indicator and drive the `editing` presence override.
    pub async fn typing(
        &self,
        session_id: Uuid,
        user_id: &str,
        started: bool,
    ) -> Result<(), CollabError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;
        let session = resolve_session(&mut inner, session_id)?;

        let participant = session
            .participants
            .get_mut(user_id)
            .ok_or_else(|| CollabError::BadRequest("not a participant of this session".into()))?;
        participant.last_activity_at = now;
        participant.editing_until = if started {
            Some(now + Duration::seconds(EDITING_QUIET_SECS))
        } else {
            None
        };

        let broadcast = TypingBroadcastMessage {
            session_id,
            user_id: user_id.to_string(),
        };
        let message = if started {
            ServerMessage::TypingStart(broadcast)
        } else {
            ServerMessage::TypingStop(broadcast)
        };
        self.registry
            .broadcast(session_id, &message, Some(user_id))
            .await;
        Ok(())
    }

    /// Push a freshly persisted comment to every participant of the
    /// document's live session, if one exists.
    pub async fn broadcast_comment_added(&self, comment: &Comment) {
        let inner = self.inner.lock().await;
        let Some(session) = inner.by_document.get(&comment.document_id) else {
            return;
        };
        self.registry
            .broadcast(
                session.session_id,
                &ServerMessage::CommentAdded(crate::models::messages::CommentAddedMessage {
                    comment: comment.clone(),
                }),
                None,
            )
            .await;
    }

    /// Tell all live participants to refresh to a new version (rollback).
    pub async fn broadcast_document_updated(&self, document_id: Uuid, new_version_id: Uuid) {
        let inner = self.inner.lock().await;
        let Some(session) = inner.by_document.get(&document_id) else {
            return;
        };
        self.registry
            .broadcast(
                session.session_id,
                &ServerMessage::DocumentUpdated(DocumentUpdatedMessage {
                    document_id,
                    new_version_id,
                }),
                None,
            )
            .await;
    }

    fn spawn_presence_sweep(self: &Arc<Self>, document_id: Uuid) {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(SWEEP_PERIOD_SECS));
            interval.tick().await; // first tick completes immediately
            loop {
                interval.tick().await;
                if !hub.sweep(document_id).await {
                    break;
                }
            }
        });
    }

    /// One pass of the per-session sweep: recompute all participant statuses
    /// (emitting `presence_update` only for actual changes) and reap
    /// connections that missed the heartbeat window. Returns false once the
    /// session is gone, ending the sweep task.
    pub async fn sweep(self: &Arc<Self>, document_id: Uuid) -> bool {
        let now = Utc::now();
        let stale: Vec<(Uuid, String)>;
        let session_id;
        {
            let mut inner = self.inner.lock().await;
            let Some(session) = inner.by_document.get_mut(&document_id) else {
                return false;
            };
            session_id = session.session_id;

            let mut updates: Vec<PresenceUpdateMessage> = Vec::new();
            for participant in session.participants.values_mut() {
                let derived =
                    presence::derive_status(participant.last_activity_at, participant.editing_until, now);
                if derived != participant.last_broadcast_status {
                    participant.last_broadcast_status = derived;
                    updates.push(PresenceUpdateMessage {
                        session_id,
                        user_id: participant.user_id.clone(),
                        status: derived,
                    });
                }
            }
            for update in updates {
                self.registry
                    .broadcast(session_id, &ServerMessage::PresenceUpdate(update), None)
                    .await;
            }

            stale = self.registry.stale_connections(session_id, now).await;
        }

        // Reap outside the lock: leave() re-acquires it
        for (connection_id, user_id) in stale {
            warn!(
                "Connection {} of user {} missed heartbeat window, deregistering",
                connection_id, user_id
            );
            self.leave(session_id, &user_id, connection_id).await;
        }
        true
    }

    /// Current participant count of a document's session, if live
    pub async fn participant_count(&self, document_id: Uuid) -> Option<usize> {
        let inner = self.inner.lock().await;
        inner
            .by_document
            .get(&document_id)
            .map(|s| s.participants.len())
    }

    /// Live session id for a document, if any
    pub async fn live_session_id(&self, document_id: Uuid) -> Option<Uuid> {
        let inner = self.inner.lock().await;
        inner.by_document.get(&document_id).map(|s| s.session_id)
    }

    /// Aggregate counters for the diagnostics endpoint
    pub async fn diagnostics(&self) -> (u32, u32, u32) {
        let inner = self.inner.lock().await;
        let n_sessions = inner.by_document.len() as u32;
        let n_participants = inner
            .by_document
            .values()
            .map(|s| s.participants.len() as u32)
            .sum();
        drop(inner);
        let n_connections = self.registry.connection_count().await as u32;
        (n_sessions, n_participants, n_connections)
    }
}

fn resolve_session<'a>(
    inner: &'a mut HubInner,
    session_id: Uuid,
) -> Result<&'a mut Session, CollabError> {
    let document_id = *inner
        .by_session_id
        .get(&session_id)
        .ok_or_else(|| CollabError::BadRequest("unknown session".into()))?;
    inner
        .by_document
        .get_mut(&document_id)
        .ok_or_else(|| CollabError::BadRequest("unknown session".into()))
}
