use crate::handlers::{CommentAction, CommentActionRequest, CreateCommentRequest};
use crate::models::*;
use utoipa::OpenApi;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// List versions of a document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{document_id}/versions",
    params(
        ("document_id" = uuid::Uuid, Path, description = "Document id"),
        ("page" = Option<u32>, Query, description = "Page, 1-based"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Paginated versions, newest first", body = VersionListResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn list_versions_doc() {}

/// Create a manual snapshot of a document
#[utoipa::path(
    post,
    path = "/api/v1/documents/{document_id}/versions",
    request_body = CreateSnapshotRequest,
    responses(
        (status = 201, description = "New version appended", body = PolicyVersion),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_snapshot_doc() {}

/// Diff two versions of a document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{document_id}/versions/diff",
    params(
        ("document_id" = uuid::Uuid, Path, description = "Document id"),
        ("from" = uuid::Uuid, Query, description = "Source version id"),
        ("to" = uuid::Uuid, Query, description = "Target version id")
    ),
    responses(
        (status = 200, description = "Line diff between the two versions", body = DiffResponse),
        (status = 404, description = "Version not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn diff_versions_doc() {}

/// Roll a document back to a historical version
#[utoipa::path(
    post,
    path = "/api/v1/documents/{document_id}/versions/rollback",
    request_body = RollbackRequest,
    responses(
        (status = 201, description = "New version appended with the target's content", body = PolicyVersion),
        (status = 404, description = "Version not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn rollback_doc() {}

/// List comment threads of a document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{document_id}/comments",
    params(
        ("document_id" = uuid::Uuid, Path, description = "Document id")
    ),
    responses(
        (status = 200, description = "Comment threads, pinned first", body = [CommentThread]),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn list_comments_doc() {}

/// Create a comment on a document
#[utoipa::path(
    post,
    path = "/api/v1/documents/{document_id}/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Created comment", body = Comment),
        (status = 404, description = "Document or parent comment not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_comment_doc() {}

/// Live collaboration counters
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Session, participant and connection counts", body = DiagnosticsResponse),
        (status = 403, description = "Cloud Admin access required", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Edit, resolve, reopen, pin or delete a comment
#[utoipa::path(
    patch,
    path = "/api/v1/comments/{comment_id}",
    request_body = CommentActionRequest,
    responses(
        (status = 200, description = "Updated comment", body = Comment),
        (status = 403, description = "Not permitted", body = ErrorResponse),
        (status = 409, description = "Edit window expired", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn update_comment_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        list_versions_doc,
        create_snapshot_doc,
        diff_versions_doc,
        rollback_doc,
        list_comments_doc,
        create_comment_doc,
        update_comment_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            PolicyVersion,
            PolicyVersionSummary,
            VersionListResponse,
            CreateSnapshotRequest,
            RollbackRequest,
            DiffResponse,
            DiffRecord,
            DiffLineType,
            Comment,
            CommentThread,
            CommentType,
            CommentStatus,
            CreateCommentRequest,
            CommentAction,
            CommentActionRequest,
            DiagnosticsResponse,
        )
    ),
    tags(
        (name = "api", description = "Collaboration API endpoints")
    )
)]
pub struct ApiDoc;
