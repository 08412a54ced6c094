use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Derived activity status of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Active,
    Idle,
    Editing,
    Away,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Active => "active",
            PresenceStatus::Idle => "idle",
            PresenceStatus::Editing => "editing",
            PresenceStatus::Away => "away",
        }
    }
}

/// Cursor position within a document. Ephemeral: overwritten on every
/// update, never queued, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

/// Snapshot of a participant as sent to clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub user_id: String,
    pub display_name: String,
    pub status: PresenceStatus,
    pub cursor_position: Option<CursorPosition>,
    pub color: String,
    pub last_activity_at: DateTime<Utc>,
}

/// Palette used for participant disambiguation in the editing UI
const PARTICIPANT_COLORS: [&str; 10] = [
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6", "#008080",
    "#9a6324", "#800000",
];

/// Stable per-user color, derived deterministically from the user id hash.
pub fn color_for_user(user_id: &str) -> String {
    // FNV-1a over the user id bytes
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in user_id.as_bytes() {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    PARTICIPANT_COLORS[(hash % PARTICIPANT_COLORS.len() as u64) as usize].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_is_stable_per_user() {
        assert_eq!(color_for_user("u42"), color_for_user("u42"));
    }

    #[test]
    fn color_is_a_palette_entry() {
        let c = color_for_user("anyone");
        assert!(PARTICIPANT_COLORS.contains(&c.as_str()));
    }
}
