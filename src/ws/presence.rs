use chrono::{DateTime, Duration, Utc};

use crate::models::PresenceStatus;

/// Activity within this window counts as `active`
pub const ACTIVE_WINDOW_SECS: i64 = 120;
/// Activity within this window (but past the active window) counts as `idle`
pub const IDLE_WINDOW_SECS: i64 = 300;
/// How long the `editing` override outlives the last text change
pub const EDITING_QUIET_SECS: i64 = 3;
/// Period of the per-session presence sweep
pub const SWEEP_PERIOD_SECS: u64 = 5;

/// Derive a participant's presence status.
///
/// Evaluated lazily on read and by the per-session sweep; there is no timer
/// per participant. The `editing` override takes precedence over the
/// time-based states while it is live.
pub fn derive_status(
    last_activity_at: DateTime<Utc>,
    editing_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> PresenceStatus {
    if let Some(until) = editing_until {
        if now < until {
            return PresenceStatus::Editing;
        }
    }

    let elapsed = now - last_activity_at;
    if elapsed <= Duration::seconds(ACTIVE_WINDOW_SECS) {
        PresenceStatus::Active
    } else if elapsed <= Duration::seconds(IDLE_WINDOW_SECS) {
        PresenceStatus::Idle
    } else {
        PresenceStatus::Away
    }
}
