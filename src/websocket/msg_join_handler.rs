use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::auth::Actor;
use crate::models::messages::{JoinPolicyMessage, ServerMessage};
use crate::models::CollabError;
use crate::websocket::handler::send_error;
use crate::ws::session::SessionHub;

/// Handle a join_policy message: bind this connection to the document's
/// live session (creating one on first join) and return the session id.
pub async fn handle_join_message(
    join_msg: &JoinPolicyMessage,
    document_id: Uuid,
    actor: &Actor,
    connection_id: Uuid,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    hub: &Arc<SessionHub>,
) -> Option<Uuid> {
    // The socket is bound to one document; a join for another is a protocol error
    if join_msg.document_id != document_id {
        warn!(
            "Join for document {} on a connection bound to {}",
            join_msg.document_id, document_id
        );
        send_error(
            tx,
            CollabError::BadRequest("join does not match the connected document".into()),
        );
        return None;
    }

    match hub
        .join(
            actor,
            document_id,
            &join_msg.display_name,
            connection_id,
            tx.clone(),
        )
        .await
    {
        Ok(joined) => {
            info!(
                "User {} joined session {} for document {}",
                actor.user_id, joined.session_id, document_id
            );
            let session_id = joined.session_id;
            let _ = tx.send(ServerMessage::Joined(joined));
            Some(session_id)
        }
        Err(e) => {
            warn!("Join failed for user {}: {}", actor.user_id, e);
            send_error(tx, e);
            None
        }
    }
}
