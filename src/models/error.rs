use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

/// Error taxonomy of the collaboration core.
///
/// Validation and authorization failures are returned synchronously to the
/// originating caller and never broadcast. `SnapshotConflict` surfaces only
/// after the version service has exhausted its retries.
#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    #[error("Document '{0}' not found")]
    DocumentNotFound(String),

    #[error("Version '{0}' not found for this document")]
    VersionNotFound(String),

    #[error("The edit window for this comment has expired")]
    EditWindowExpired,

    #[error("Only the author may perform this action")]
    NotAuthor,

    #[error("Insufficient role for this action")]
    InsufficientRole,

    #[error("Concurrent version number assignment for document '{0}'")]
    SnapshotConflict(String),

    #[error("Comment '{0}' not found")]
    CommentNotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CollabError {
    /// Stable machine-readable kind, used in WebSocket error frames.
    pub fn kind(&self) -> &'static str {
        match self {
            CollabError::DocumentNotFound(_) => "document_not_found",
            CollabError::VersionNotFound(_) => "version_not_found",
            CollabError::EditWindowExpired => "edit_window_expired",
            CollabError::NotAuthor => "not_author",
            CollabError::InsufficientRole => "insufficient_role",
            CollabError::SnapshotConflict(_) => "snapshot_conflict",
            CollabError::CommentNotFound(_) => "comment_not_found",
            CollabError::BadRequest(_) => "bad_request",
            CollabError::Storage(_) => "storage_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CollabError::DocumentNotFound(_)
            | CollabError::VersionNotFound(_)
            | CollabError::CommentNotFound(_) => StatusCode::NOT_FOUND,
            CollabError::EditWindowExpired | CollabError::SnapshotConflict(_) => {
                StatusCode::CONFLICT
            }
            CollabError::NotAuthor | CollabError::InsufficientRole => StatusCode::FORBIDDEN,
            CollabError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CollabError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map the error into the HTTP response shape used by the REST handlers.
    pub fn into_response_parts(self) -> (StatusCode, Json<ErrorResponse>) {
        let status = self.status_code();
        (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error: self.to_string(),
            }),
        )
    }
}
