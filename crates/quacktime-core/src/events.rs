use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::TimerState;

/// Every state change in the system produces an Event.
/// Hosts print or render them; nothing in the core consumes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        at: DateTime<Utc>,
    },
    BreakStarted {
        elapsed_focus_secs: u64,
        at: DateTime<Utc>,
    },
    BreakEnded {
        elapsed_break_secs: u64,
        at: DateTime<Utc>,
    },
    /// Session halted; awaiting the user's confirmation.
    SessionStopped {
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        focus_secs: u64,
        break_secs: u64,
    },
    SessionReset {
        discarded_focus_secs: u64,
        discarded_break_secs: u64,
        at: DateTime<Utc>,
    },
    /// Session recovered from a snapshot, with suspended time added.
    SessionRestored {
        state: TimerState,
        elapsed_focus_secs: u64,
        elapsed_break_secs: u64,
        session_start: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    /// Confirmation was cancelled; the stopped session is gone.
    SessionDiscarded {
        focus_secs: u64,
        break_secs: u64,
        at: DateTime<Utc>,
    },
    ActivitySaved {
        id: Uuid,
        name: String,
        emoji: String,
        focus_secs: u64,
        break_secs: u64,
        at: DateTime<Utc>,
    },
    /// First qualifying session of a calendar day.
    StreakDay {
        streak: u32,
        header: String,
        sub_header: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        elapsed_focus_secs: u64,
        elapsed_break_secs: u64,
        session_start: Option<DateTime<Utc>>,
        formatted_time: String,
        at: DateTime<Utc>,
    },
}
