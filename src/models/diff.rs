use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of a single line in a computed diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineType {
    Added,
    Removed,
    Unchanged,
}

/// One line of a computed diff between two version contents.
///
/// Diffs are derived on demand and never stored; persisting them would create
/// a second source of truth that could drift from the append-only version log.
/// `line_number` is 1-based: for removed lines it indexes the `from` content,
/// for added lines the `to` content, for unchanged lines the `from` content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiffRecord {
    #[serde(rename = "type")]
    pub line_type: DiffLineType,
    pub line_number: u32,
    pub text: String,
}

/// Response for the diff endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiffResponse {
    pub from_version_id: uuid::Uuid,
    pub to_version_id: uuid::Uuid,
    pub records: Vec<DiffRecord>,
}
