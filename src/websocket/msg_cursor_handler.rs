use std::sync::Arc;
use tokio::sync::mpsc;

use crate::auth::auth::Actor;
use crate::models::messages::{CursorMoveMessage, ServerMessage};
use crate::websocket::handler::send_error;
use crate::ws::session::SessionHub;

/// Handle a cursor_move message: overwrite the participant's cursor state
/// and relay the position to the other participants.
pub async fn handle_cursor_message(
    cursor_msg: &CursorMoveMessage,
    actor: &Actor,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    hub: &Arc<SessionHub>,
) {
    if let Err(e) = hub
        .cursor_move(cursor_msg.session_id, &actor.user_id, cursor_msg.position)
        .await
    {
        send_error(tx, e);
    }
}
