//! Presentation hooks for lock-screen / widget style surfaces.
//!
//! The session pushes a [`DisplayState`] after every tick and transition.
//! Publishers render it however they like; the only way back into the
//! session is [`FocusSession::request_break_toggle`](crate::FocusSession::request_break_toggle).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::timer::TimerState;

/// What an external surface needs to draw the running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayState {
    pub activity_name: String,
    pub emoji: String,
    pub state: TimerState,
    pub elapsed_focus_secs: u64,
    pub elapsed_break_secs: u64,
    pub session_start: Option<DateTime<Utc>>,
}

impl DisplayState {
    /// Break time while on break, focus time otherwise.
    pub fn formatted_time(&self) -> String {
        let secs = match self.state {
            TimerState::OnBreak => self.elapsed_break_secs,
            _ => self.elapsed_focus_secs,
        };
        format_clock(secs)
    }
}

pub trait DisplayPublisher {
    /// Called after every tick and transition of an active session.
    fn publish(&mut self, state: &DisplayState);

    /// Called once when the session stops or is reset.
    fn end(&mut self);
}

/// Publishes nowhere.
#[derive(Debug, Default)]
pub struct NullDisplay;

impl DisplayPublisher for NullDisplay {
    fn publish(&mut self, _state: &DisplayState) {}

    fn end(&mut self) {}
}

/// Publishes to the log at debug level.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl DisplayPublisher for LogDisplay {
    fn publish(&mut self, state: &DisplayState) {
        debug!(
            name = %state.activity_name,
            state = state.state.as_str(),
            time = %state.formatted_time(),
            "display"
        );
    }

    fn end(&mut self) {
        debug!("display ended");
    }
}

/// `H:MM:SS` from one hour up, `MM:SS` below.
pub fn format_clock(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(3599), "59:59");
        assert_eq!(format_clock(3600), "1:00:00");
        assert_eq!(format_clock(3 * 3600 + 7 * 60 + 9), "3:07:09");
    }

    #[test]
    fn formatted_time_follows_state() {
        let mut state = DisplayState {
            activity_name: "Study".into(),
            emoji: "📚".into(),
            state: TimerState::Running,
            elapsed_focus_secs: 125,
            elapsed_break_secs: 30,
            session_start: None,
        };
        assert_eq!(state.formatted_time(), "02:05");
        state.state = TimerState::OnBreak;
        assert_eq!(state.formatted_time(), "00:30");
    }
}
