use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// An immutable full-content snapshot of a policy document.
///
/// Versions form an append-only log per document: `version_number` strictly
/// increases with no gaps and no record is ever mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyVersion {
    pub version_id: Uuid,
    pub document_id: Uuid,
    pub org_id: String,
    /// Monotonically increasing per document, starting at 1
    pub version_number: i32,
    /// Full snapshot, never a delta
    pub content: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub change_summary: Option<String>,
    pub is_rollback: bool,
    pub rollback_source_version_id: Option<Uuid>,
}

/// Version metadata without content, for paginated listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyVersionSummary {
    pub version_id: Uuid,
    pub document_id: Uuid,
    pub version_number: i32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub change_summary: Option<String>,
    pub is_rollback: bool,
    pub rollback_source_version_id: Option<Uuid>,
}

impl From<&PolicyVersion> for PolicyVersionSummary {
    fn from(v: &PolicyVersion) -> Self {
        Self {
            version_id: v.version_id,
            document_id: v.document_id,
            version_number: v.version_number,
            created_by: v.created_by.clone(),
            created_at: v.created_at,
            change_summary: v.change_summary.clone(),
            is_rollback: v.is_rollback,
            rollback_source_version_id: v.rollback_source_version_id,
        }
    }
}

/// Request body for creating a manual snapshot
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshotRequest {
    pub content: String,
    pub change_summary: Option<String>,
}

/// Request body for a rollback
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRequest {
    pub target_version_id: Uuid,
}

/// Paginated version listing
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VersionListResponse {
    pub versions: Vec<PolicyVersionSummary>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}
