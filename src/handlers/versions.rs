use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::auth::{can, Actor, Capability};
use crate::models::{
    CollabError, CreateSnapshotRequest, DiffResponse, ErrorResponse, PolicyVersion,
    RollbackRequest, VersionListResponse,
};
use crate::AppState;

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DiffParams {
    pub from: Uuid,
    pub to: Uuid,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn reject(err: CollabError) -> HandlerError {
    err.into_response_parts()
}

/// List versions of a document, paginated, newest first
pub async fn list_versions(
    State(app_state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(document_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<(StatusCode, Json<VersionListResponse>), HandlerError> {
    if !can(&actor, Capability::ViewVersions, None) {
        return Err(reject(CollabError::InsufficientRole));
    }

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);

    let (versions, total) = app_state
        .versions
        .list(document_id, page, per_page)
        .await
        .map_err(reject)?;

    Ok((
        StatusCode::OK,
        Json(VersionListResponse {
            versions,
            page,
            per_page,
            total,
        }),
    ))
}

/// Line diff between two historical versions of a document
pub async fn diff_versions(
    State(app_state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(document_id): Path<Uuid>,
    Query(params): Query<DiffParams>,
) -> Result<(StatusCode, Json<DiffResponse>), HandlerError> {
    if !can(&actor, Capability::ViewVersions, None) {
        return Err(reject(CollabError::InsufficientRole));
    }

    let records = app_state
        .versions
        .diff(document_id, params.from, params.to)
        .await
        .map_err(reject)?;

    Ok((
        StatusCode::OK,
        Json(DiffResponse {
            from_version_id: params.from,
            to_version_id: params.to,
            records,
        }),
    ))
}

/// Create a manual snapshot of a document
pub async fn create_snapshot(
    State(app_state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(document_id): Path<Uuid>,
    Json(request): Json<CreateSnapshotRequest>,
) -> Result<(StatusCode, Json<PolicyVersion>), HandlerError> {
    if !can(&actor, Capability::CreateSnapshot, None) {
        return Err(reject(CollabError::InsufficientRole));
    }

    let version = app_state
        .versions
        .create_snapshot(
            document_id,
            &actor.org_id,
            request.content,
            &actor.user_id,
            request.change_summary,
        )
        .await
        .map_err(reject)?;

    Ok((StatusCode::CREATED, Json(version)))
}

/// Roll a document back to a historical version. Appends a new version and
/// tells the live session to refresh; history is never rewritten.
pub async fn rollback_version(
    State(app_state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(document_id): Path<Uuid>,
    Json(request): Json<RollbackRequest>,
) -> Result<(StatusCode, Json<PolicyVersion>), HandlerError> {
    if !can(&actor, Capability::Rollback, None) {
        return Err(reject(CollabError::InsufficientRole));
    }

    let version = app_state
        .versions
        .rollback(document_id, request.target_version_id, &actor.user_id)
        .await
        .map_err(reject)?;

    info!(
        "Document {} rolled back to version {} by {} (new version {})",
        document_id, request.target_version_id, actor.user_id, version.version_id
    );

    app_state
        .hub
        .broadcast_document_updated(document_id, version.version_id)
        .await;

    Ok((StatusCode::CREATED, Json(version)))
}
