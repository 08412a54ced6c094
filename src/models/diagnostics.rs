use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Live collaboration counters for the diagnostics endpoint
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsResponse {
    pub n_sessions: u32,
    pub n_participants: u32,
    pub n_connections: u32,
}
