//! Session timer state machine.
//!
//! The timer counts ticks, not wall-clock deltas: every call to `tick()`
//! adds exactly one second to the accumulator of the current state. It
//! owns no thread; the host fires `tick()` once per second and persists
//! the state after each call (see [`FocusSession`](crate::FocusSession)).
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Running <--toggle_break--> OnBreak
//!                    |                          |
//!                    +------ stop / reset ------+--> Idle
//! ```
//!
//! Commands issued from the wrong state are rejected: they return `None`
//! and leave the timer untouched.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::events::Event;
use crate::snapshot::RestoredSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerState {
    Idle,
    Running,
    OnBreak,
}

impl TimerState {
    /// Running or on break.
    pub fn is_active(self) -> bool {
        !matches!(self, TimerState::Idle)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::OnBreak => "onBreak",
        }
    }
}

/// A stopped session awaiting the user's confirmation.
///
/// Either becomes an [`ActivityRecord`](crate::ActivityRecord) or is
/// dropped; it is never written back into the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSession {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub focus_secs: u64,
    pub break_secs: u64,
}

impl PendingSession {
    pub fn total_secs(&self) -> u64 {
        self.focus_secs + self.break_secs
    }

    pub fn to_event(&self) -> Event {
        Event::SessionStopped {
            start_time: self.start_time,
            end_time: self.end_time,
            focus_secs: self.focus_secs,
            break_secs: self.break_secs,
        }
    }
}

/// Focus/break accumulators plus the current [`TimerState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimer {
    state: TimerState,
    elapsed_focus_secs: u64,
    elapsed_break_secs: u64,
    session_start: Option<DateTime<Utc>>,
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTimer {
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            elapsed_focus_secs: 0,
            elapsed_break_secs: 0,
            session_start: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn elapsed_focus_secs(&self) -> u64 {
        self.elapsed_focus_secs
    }

    pub fn elapsed_break_secs(&self) -> u64 {
        self.elapsed_break_secs
    }

    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        self.session_start
    }

    /// Seconds shown on the main dial: break time while on break,
    /// focus time otherwise.
    pub fn displayed_secs(&self) -> u64 {
        match self.state {
            TimerState::OnBreak => self.elapsed_break_secs,
            _ => self.elapsed_focus_secs,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, at: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            state: self.state,
            elapsed_focus_secs: self.elapsed_focus_secs,
            elapsed_break_secs: self.elapsed_break_secs,
            session_start: self.session_start,
            formatted_time: crate::display::format_clock(self.displayed_secs()),
            at,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != TimerState::Idle {
            warn!(state = self.state.as_str(), "start rejected: session already active");
            return None;
        }
        self.state = TimerState::Running;
        self.session_start = Some(now);
        self.elapsed_focus_secs = 0;
        self.elapsed_break_secs = 0;
        Some(Event::SessionStarted { at: now })
    }

    /// Advance the active accumulator by one second.
    ///
    /// Returns `false` while idle.
    pub fn tick(&mut self) -> bool {
        match self.state {
            TimerState::Running => {
                self.elapsed_focus_secs += 1;
                true
            }
            TimerState::OnBreak => {
                self.elapsed_break_secs += 1;
                true
            }
            TimerState::Idle => false,
        }
    }

    pub fn toggle_break(&mut self, now: DateTime<Utc>) -> Option<Event> {
        match self.state {
            TimerState::Running => {
                self.state = TimerState::OnBreak;
                Some(Event::BreakStarted {
                    elapsed_focus_secs: self.elapsed_focus_secs,
                    at: now,
                })
            }
            TimerState::OnBreak => {
                self.state = TimerState::Running;
                Some(Event::BreakEnded {
                    elapsed_break_secs: self.elapsed_break_secs,
                    at: now,
                })
            }
            TimerState::Idle => {
                warn!("toggle_break rejected: no active session");
                None
            }
        }
    }

    /// Halt the session and hand its totals to the caller.
    ///
    /// The timer returns to `Idle` with zeroed accumulators; the returned
    /// [`PendingSession`] is the only copy of the session's data.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<PendingSession> {
        if !self.state.is_active() {
            warn!("stop rejected: no active session");
            return None;
        }
        let total = self.elapsed_focus_secs + self.elapsed_break_secs;
        let start_time = self
            .session_start
            .unwrap_or_else(|| now - Duration::seconds(total as i64));
        let pending = PendingSession {
            start_time,
            end_time: now.max(start_time),
            focus_secs: self.elapsed_focus_secs,
            break_secs: self.elapsed_break_secs,
        };
        self.clear();
        Some(pending)
    }

    /// Discard the active session without producing a record.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.state.is_active() {
            warn!("reset rejected: no active session");
            return None;
        }
        let event = Event::SessionReset {
            discarded_focus_secs: self.elapsed_focus_secs,
            discarded_break_secs: self.elapsed_break_secs,
            at: now,
        };
        self.clear();
        Some(event)
    }

    /// Adopt a session recovered from a persisted snapshot.
    pub fn restore(&mut self, restored: &RestoredSession, now: DateTime<Utc>) -> Event {
        self.state = restored.state;
        self.elapsed_focus_secs = restored.elapsed_focus_secs;
        self.elapsed_break_secs = restored.elapsed_break_secs;
        self.session_start = restored.session_start;
        Event::SessionRestored {
            state: restored.state,
            elapsed_focus_secs: restored.elapsed_focus_secs,
            elapsed_break_secs: restored.elapsed_break_secs,
            session_start: restored.session_start,
            at: now,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn clear(&mut self) {
        self.state = TimerState::Idle;
        self.elapsed_focus_secs = 0;
        self.elapsed_break_secs = 0;
        self.session_start = None;
    }
}
