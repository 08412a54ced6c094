use std::sync::Arc;
use tokio::sync::mpsc;

use crate::auth::auth::Actor;
use crate::models::messages::{ServerMessage, TextChangeMessage};
use crate::websocket::handler::send_error;
use crate::ws::session::SessionHub;

/// Handle a text_change message.
///
/// The hub relays the change to the other participants in server receipt
/// order and may trigger a cadence snapshot; it never applies the change to
/// any canonical store. Overlapping changes are both broadcast as they
/// arrived, and the editing surface reconciles them visually.
pub async fn handle_change_message(
    change_msg: TextChangeMessage,
    actor: &Actor,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    hub: &Arc<SessionHub>,
) {
    if let Err(e) = hub
        .publish_change(
            change_msg.session_id,
            actor,
            &change_msg.change_type,
            change_msg.payload,
            change_msg.content,
        )
        .await
    {
        send_error(tx, e);
    }
}
