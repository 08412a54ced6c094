use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::auth::Actor;
use crate::models::messages::{ClientMessage, ErrorFrameMessage, PongMessage, ServerMessage};
use crate::models::CollabError;
use crate::websocket::{
    msg_change_handler::handle_change_message, msg_comment_handler::handle_comment_message,
    msg_cursor_handler::handle_cursor_message, msg_join_handler::handle_join_message,
    msg_typing_handler::handle_typing_message,
};
use crate::AppState;

/// WebSocket handler
pub async fn websocket_handler(
    Path(document_id): Path<Uuid>,
    ws: WebSocketUpgrade,
    Extension(actor): Extension<Actor>,
    app_state: State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt for document {}", document_id);
    ws.on_upgrade(move |socket| handle_socket(socket, document_id, actor, app_state.0))
}

/// Queue a structured error frame for a rejected action. Rejected actions
/// produce no broadcasts; only the originating client hears about them.
pub fn send_error(tx: &mpsc::UnboundedSender<ServerMessage>, err: CollabError) {
    let _ = tx.send(ServerMessage::Error(ErrorFrameMessage {
        kind: err.kind().to_string(),
        message: err.to_string(),
    }));
}

/// Handle WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    document_id: Uuid,
    actor: Actor,
    app_state: Arc<AppState>,
) {
    // Unique connection id identifying this client to the registry
    let connection_id = Uuid::new_v4();
    info!(
        "WebSocket connection established for document {} with connection_id {}",
        document_id, connection_id
    );

    // Split the socket into sender and receiver
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Outbound frames go through a channel so the registry can push
    // broadcasts without touching the socket directly
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Session this connection has joined, shared with the cleanup path
    let joined_session: Arc<Mutex<Option<Uuid>>> = Arc::new(Mutex::new(None));

    let mut write_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize outbound frame: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let state = app_state.clone();
    let read_tx = tx.clone();
    let read_actor = actor.clone();
    let read_session = joined_session.clone();
    let mut read_task = tokio::spawn(async move {
        let hub = &state.hub;
        while let Some(Ok(Message::Text(msg))) = ws_receiver.next().await {
            let client_msg: ClientMessage = match serde_json::from_str(&msg) {
                Ok(client_msg) => client_msg,
                Err(e) => {
                    error!("Failed to parse frame on connection {}: {}", connection_id, e);
                    send_error(
                        &read_tx,
                        CollabError::BadRequest(format!("unparseable frame: {}", e)),
                    );
                    continue;
                }
            };

            hub.registry().touch(connection_id, chrono::Utc::now()).await;

            match client_msg {
                ClientMessage::JoinPolicy(join_msg) => {
                    let session = handle_join_message(
                        &join_msg,
                        document_id,
                        &read_actor,
                        connection_id,
                        &read_tx,
                        hub,
                    )
                    .await;
                    *read_session.lock().unwrap() = session;
                }
                ClientMessage::LeavePolicy(leave_msg) => {
                    hub.leave(leave_msg.session_id, &read_actor.user_id, connection_id)
                        .await;
                    *read_session.lock().unwrap() = None;
                }
                ClientMessage::CursorMove(cursor_msg) => {
                    handle_cursor_message(&cursor_msg, &read_actor, &read_tx, hub).await;
                }
                ClientMessage::TextChange(change_msg) => {
                    handle_change_message(change_msg, &read_actor, &read_tx, hub).await;
                }
                ClientMessage::AddComment(comment_msg) => {
                    handle_comment_message(comment_msg, &read_actor, &read_tx, &state).await;
                }
                ClientMessage::TypingStart(typing_msg) => {
                    handle_typing_message(&typing_msg, true, &read_actor, &read_tx, hub).await;
                }
                ClientMessage::TypingStop(typing_msg) => {
                    handle_typing_message(&typing_msg, false, &read_actor, &read_tx, hub).await;
                }
                ClientMessage::Ping(_) => {
                    let _ = read_tx.send(ServerMessage::Pong(PongMessage {
                        date: chrono::Utc::now().to_rfc3339(),
                    }));
                }
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut read_task) => write_task.abort(),
        _ = (&mut write_task) => read_task.abort(),
    };

    // Transport gone: degrade to leave semantics, never raise to the client
    let session = *joined_session.lock().unwrap();
    match session {
        Some(session_id) => {
            app_state
                .hub
                .leave(session_id, &actor.user_id, connection_id)
                .await;
        }
        None => {
            app_state.hub.registry().deregister(connection_id).await;
        }
    }
    info!("WebSocket connection {} terminated", connection_id);
}
