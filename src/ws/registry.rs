use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::messages::ServerMessage;

/// A connection with no inbound activity for this long is forcibly
/// deregistered as if the owning user had left.
pub const HEARTBEAT_TIMEOUT_SECS: i64 = 60;

/// One live WebSocket connection
#[derive(Debug)]
pub struct Connection {
    pub connection_id: Uuid,
    pub session_id: Uuid,
    pub user_id: String,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<Uuid, Connection>,
    by_session: HashMap<Uuid, HashSet<Uuid>>,
}

/// Tracks live WebSocket connections per session.
///
/// Constructed once per process and owned by the session hub; all mutation
/// goes through this single-writer boundary. Never holds business state:
/// participants live in the session map, persisted data in the store.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, connection: Connection) {
        let mut inner = self.inner.lock().await;
        debug!(
            "Registering connection {} for session {} (user {})",
            connection.connection_id, connection.session_id, connection.user_id
        );
        inner
            .by_session
            .entry(connection.session_id)
            .or_default()
            .insert(connection.connection_id);
        inner
            .connections
            .insert(connection.connection_id, connection);
    }

    pub async fn deregister(&self, connection_id: Uuid) -> Option<Connection> {
        let mut inner = self.inner.lock().await;
        let connection = inner.connections.remove(&connection_id)?;
        if let Some(set) = inner.by_session.get_mut(&connection.session_id) {
            set.remove(&connection_id);
            if set.is_empty() {
                inner.by_session.remove(&connection.session_id);
            }
        }
        debug!("Deregistered connection {}", connection_id);
        Some(connection)
    }

    /// Record inbound activity on a connection
    pub async fn touch(&self, connection_id: Uuid, now: DateTime<Utc>) {
        let mut inner = self.inner.lock().await;
        if let Some(conn) = inner.connections.get_mut(&connection_id) {
            conn.last_seen = now;
        }
    }

    /// Fan a frame out to every connection in a session, optionally skipping
    /// all connections of one user (the originator).
    pub async fn broadcast(
        &self,
        session_id: Uuid,
        message: &ServerMessage,
        exclude_user: Option<&str>,
    ) {
        let inner = self.inner.lock().await;
        let Some(conn_ids) = inner.by_session.get(&session_id) else {
            return;
        };
        for conn_id in conn_ids {
            let Some(conn) = inner.connections.get(conn_id) else {
                continue;
            };
            if exclude_user == Some(conn.user_id.as_str()) {
                continue;
            }
            if conn.sender.send(message.clone()).is_err() {
                // The writer task is gone; the heartbeat sweep will reap it.
                warn!("Failed to queue frame for connection {}", conn_id);
            }
        }
    }

    /// Number of live connections a user holds within a session
    pub async fn user_connection_count(&self, session_id: Uuid, user_id: &str) -> usize {
        let inner = self.inner.lock().await;
        let Some(conn_ids) = inner.by_session.get(&session_id) else {
            return 0;
        };
        conn_ids
            .iter()
            .filter_map(|id| inner.connections.get(id))
            .filter(|c| c.user_id == user_id)
            .count()
    }

    pub async fn session_connection_count(&self, session_id: Uuid) -> usize {
        let inner = self.inner.lock().await;
        inner
            .by_session
            .get(&session_id)
            .map_or(0, |set| set.len())
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.lock().await.connections.len()
    }

    /// Connections in a session with no inbound activity past the heartbeat
    /// timeout, as (connection_id, user_id) pairs.
    pub async fn stale_connections(
        &self,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Vec<(Uuid, String)> {
        let cutoff = now - Duration::seconds(HEARTBEAT_TIMEOUT_SECS);
        let inner = self.inner.lock().await;
        let Some(conn_ids) = inner.by_session.get(&session_id) else {
            return Vec::new();
        };
        conn_ids
            .iter()
            .filter_map(|id| inner.connections.get(id))
            .filter(|c| c.last_seen < cutoff)
            .map(|c| (c.connection_id, c.user_id.clone()))
            .collect()
    }

    /// Drop every connection of a session (session teardown)
    pub async fn drop_session(&self, session_id: Uuid) {
        let mut inner = self.inner.lock().await;
        if let Some(conn_ids) = inner.by_session.remove(&session_id) {
            for conn_id in conn_ids {
                inner.connections.remove(&conn_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(
        session_id: Uuid,
        user_id: &str,
    ) -> (Connection, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Connection {
                connection_id: Uuid::new_v4(),
                session_id,
                user_id: user_id.to_string(),
                sender: tx,
                last_seen: Utc::now(),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn broadcast_skips_excluded_user() {
        let registry = ConnectionRegistry::new();
        let session_id = Uuid::new_v4();
        let (conn_a, mut rx_a) = connection(session_id, "userA");
        let (conn_b, mut rx_b) = connection(session_id, "userB");
        registry.register(conn_a).await;
        registry.register(conn_b).await;

        let msg = ServerMessage::Pong(crate::models::messages::PongMessage {
            date: Utc::now().to_rfc3339(),
        });
        registry.broadcast(session_id, &msg, Some("userA")).await;

        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn deregister_removes_session_index() {
        let registry = ConnectionRegistry::new();
        let session_id = Uuid::new_v4();
        let (conn, _rx) = connection(session_id, "userA");
        let conn_id = conn.connection_id;
        registry.register(conn).await;
        assert_eq!(registry.session_connection_count(session_id).await, 1);

        registry.deregister(conn_id).await;
        assert_eq!(registry.session_connection_count(session_id).await, 0);
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn stale_connections_respect_cutoff() {
        let registry = ConnectionRegistry::new();
        let session_id = Uuid::new_v4();
        let (mut conn, _rx) = connection(session_id, "userA");
        conn.last_seen = Utc::now() - Duration::seconds(HEARTBEAT_TIMEOUT_SECS + 5);
        registry.register(conn).await;

        let stale = registry.stale_connections(session_id, Utc::now()).await;
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].1, "userA");
    }
}
