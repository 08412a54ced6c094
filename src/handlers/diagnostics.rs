use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::auth::{can, Actor, Capability};
use crate::models::{CollabError, DiagnosticsResponse, ErrorResponse};
use crate::AppState;

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// Live collaboration counters, cloud-admin only
pub async fn diagnostics(
    State(app_state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<(StatusCode, Json<DiagnosticsResponse>), HandlerError> {
    if !can(&actor, Capability::ViewDiagnostics, None) {
        return Err(CollabError::InsufficientRole.into_response_parts());
    }

    let (n_sessions, n_participants, n_connections) = app_state.hub.diagnostics().await;

    Ok((
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_sessions,
            n_participants,
            n_connections,
        }),
    ))
}
