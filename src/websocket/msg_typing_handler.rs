use std::sync::Arc;
use tokio::sync::mpsc;

use crate::auth::auth::Actor;
use crate::models::messages::{ServerMessage, TypingMessage};
use crate::websocket::handler::send_error;
use crate::ws::session::SessionHub;

/// Handle typing_start / typing_stop: relay the indicator and drive the
/// transient `editing` presence override.
pub async fn handle_typing_message(
    typing_msg: &TypingMessage,
    started: bool,
    actor: &Actor,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    hub: &Arc<SessionHub>,
) {
    if let Err(e) = hub
        .typing(typing_msg.session_id, &actor.user_id, started)
        .await
    {
        send_error(tx, e);
    }
}
