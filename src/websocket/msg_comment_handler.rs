use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use crate::auth::auth::Actor;
use crate::models::messages::{AddCommentMessage, ServerMessage};
use crate::websocket::handler::send_error;
use crate::AppState;

/// Handle an add_comment message: persist the comment (with mention
/// extraction) and push the full comment object to every participant of the
/// document's live session, the author included.
pub async fn handle_comment_message(
    comment_msg: AddCommentMessage,
    actor: &Actor,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    app_state: &Arc<AppState>,
) {
    match app_state
        .comments
        .add_comment(
            actor,
            comment_msg.document_id,
            comment_msg.body,
            comment_msg.parent_comment_id,
            comment_msg.position_selector,
            comment_msg.comment_type,
        )
        .await
    {
        Ok(comment) => {
            app_state.hub.broadcast_comment_added(&comment).await;
        }
        Err(e) => {
            warn!("add_comment rejected for user {}: {}", actor.user_id, e);
            send_error(tx, e);
        }
    }
}
