use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::auth::{can, Actor, Capability};
use crate::models::{
    CollabError, Comment, CommentThread, CommentType, ErrorResponse,
};
use crate::AppState;

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn reject(err: CollabError) -> HandlerError {
    err.into_response_parts()
}

/// Request body for creating a comment over REST
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub parent_comment_id: Option<Uuid>,
    pub body: String,
    pub position_selector: serde_json::Value,
    pub comment_type: CommentType,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommentAction {
    Edit,
    Resolve,
    Reopen,
    Pin,
    Delete,
}

/// Request body for the comment PATCH endpoint
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentActionRequest {
    pub action: CommentAction,
    /// New body text, required for the edit action
    pub body: Option<String>,
}

/// List the comment threads of a document
pub async fn list_comments(
    State(app_state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(document_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Vec<CommentThread>>), HandlerError> {
    if !can(&actor, Capability::ViewComments, None) {
        return Err(reject(CollabError::InsufficientRole));
    }

    let threads = app_state
        .comments
        .list_threads(document_id)
        .await
        .map_err(reject)?;
    Ok((StatusCode::OK, Json(threads)))
}

/// Create a comment over REST (the realtime path goes over the WebSocket)
pub async fn create_comment(
    State(app_state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(document_id): Path<Uuid>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), HandlerError> {
    let comment = app_state
        .comments
        .add_comment(
            &actor,
            document_id,
            request.body,
            request.parent_comment_id,
            request.position_selector,
            request.comment_type,
        )
        .await
        .map_err(reject)?;

    app_state.hub.broadcast_comment_added(&comment).await;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Edit, resolve, reopen, pin or delete a comment
pub async fn update_comment(
    State(app_state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(comment_id): Path<Uuid>,
    Json(request): Json<CommentActionRequest>,
) -> Result<(StatusCode, Json<Comment>), HandlerError> {
    let comments = &app_state.comments;
    let comment = match request.action {
        CommentAction::Edit => {
            let body = request.body.ok_or_else(|| {
                reject(CollabError::BadRequest(
                    "edit action requires a body".into(),
                ))
            })?;
            comments.edit_comment(&actor, comment_id, body).await
        }
        CommentAction::Resolve => comments.resolve(&actor, comment_id).await,
        CommentAction::Reopen => comments.reopen(&actor, comment_id).await,
        CommentAction::Pin => comments.pin(&actor, comment_id).await,
        CommentAction::Delete => comments.delete(&actor, comment_id).await,
    }
    .map_err(reject)?;

    Ok((StatusCode::OK, Json(comment)))
}
