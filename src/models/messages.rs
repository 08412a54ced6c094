use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::comment::{Comment, CommentType};
use crate::models::session::{CursorPosition, ParticipantInfo, PresenceStatus};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinPolicyMessage {
    pub document_id: Uuid,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LeavePolicyMessage {
    pub session_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CursorMoveMessage {
    pub session_id: Uuid,
    pub position: CursorPosition,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TextChangeMessage {
    pub session_id: Uuid,
    pub change_type: String,
    pub payload: serde_json::Value,
    /// Full document content, when the editing surface chooses to attach it.
    /// Used only as snapshot material on the cadence trigger.
    pub content: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentMessage {
    pub document_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub body: String,
    pub position_selector: serde_json::Value,
    pub comment_type: CommentType,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TypingMessage {
    pub session_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PingMessage {}

/// Messages received from clients
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join_policy")]
    JoinPolicy(JoinPolicyMessage),
    #[serde(rename = "leave_policy")]
    LeavePolicy(LeavePolicyMessage),
    #[serde(rename = "cursor_move")]
    CursorMove(CursorMoveMessage),
    #[serde(rename = "text_change")]
    TextChange(TextChangeMessage),
    #[serde(rename = "add_comment")]
    AddComment(AddCommentMessage),
    #[serde(rename = "typing_start")]
    TypingStart(TypingMessage),
    #[serde(rename = "typing_stop")]
    TypingStop(TypingMessage),
    #[serde(rename = "ping")]
    Ping(PingMessage),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinedMessage {
    pub session_id: Uuid,
    pub document_id: Uuid,
    pub participants: Vec<ParticipantInfo>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserJoinedMessage {
    pub session_id: Uuid,
    pub user_id: String,
    pub display_name: String,
    pub color: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserLeftMessage {
    pub session_id: Uuid,
    pub user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CursorBroadcastMessage {
    pub session_id: Uuid,
    pub user_id: String,
    pub position: CursorPosition,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TextChangeBroadcastMessage {
    pub session_id: Uuid,
    pub user_id: String,
    pub change_type: String,
    pub payload: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TypingBroadcastMessage {
    pub session_id: Uuid,
    pub user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdateMessage {
    pub session_id: Uuid,
    pub user_id: String,
    pub status: PresenceStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdatedMessage {
    pub document_id: Uuid,
    pub new_version_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentAddedMessage {
    pub comment: Comment,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ErrorFrameMessage {
    pub kind: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

/// Messages sent to clients
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "joined")]
    Joined(JoinedMessage),
    #[serde(rename = "user_joined")]
    UserJoined(UserJoinedMessage),
    #[serde(rename = "user_left")]
    UserLeft(UserLeftMessage),
    #[serde(rename = "cursor_move")]
    CursorMove(CursorBroadcastMessage),
    #[serde(rename = "text_change")]
    TextChange(TextChangeBroadcastMessage),
    #[serde(rename = "typing_start")]
    TypingStart(TypingBroadcastMessage),
    #[serde(rename = "typing_stop")]
    TypingStop(TypingBroadcastMessage),
    #[serde(rename = "presence_update")]
    PresenceUpdate(PresenceUpdateMessage),
    #[serde(rename = "document_updated")]
    DocumentUpdated(DocumentUpdatedMessage),
    #[serde(rename = "comment_added")]
    CommentAdded(CommentAddedMessage),
    #[serde(rename = "error")]
    Error(ErrorFrameMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_are_type_tagged() {
        let raw = r#"{"type":"cursor_move","sessionId":"7f3f9fb0-0000-0000-0000-000000000001","position":{"line":4,"column":10}}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMessage::CursorMove(m) => {
                assert_eq!(m.position.line, 4);
                assert_eq!(m.position.column, 10);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn server_error_frame_serializes_kind() {
        let frame = ServerMessage::Error(ErrorFrameMessage {
            kind: "not_author".to_string(),
            message: "Only the author may perform this action".to_string(),
        });
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""kind":"not_author""#));
    }
}
