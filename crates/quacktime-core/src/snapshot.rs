//! Persisted timer snapshot and restore-on-relaunch.
//!
//! The process can be suspended or killed between any two ticks. The
//! snapshot records the timer fields plus the wall-clock time of the write;
//! on relaunch the time that passed since that write is credited to
//! whichever accumulator was running.
//!
//! Writes are best-effort. A lost snapshot only costs suspend/resume
//! accuracy, so failures are logged and never returned to the session.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::activity::{SessionLabel, DEFAULT_ACTIVITY_EMOJI, DEFAULT_ACTIVITY_NAME};
use crate::clock::Clock;
use crate::error::StorageError;
use crate::storage::KvStore;
use crate::timer::TimerState;

/// Key of the snapshot blob in every store.
pub const SNAPSHOT_KEY: &str = "SavedTimerState";

/// The persisted form of the session timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(rename = "timerState")]
    pub state: TimerState,
    #[serde(rename = "elapsedTime")]
    pub elapsed_focus_secs: u64,
    #[serde(rename = "breakTime")]
    pub elapsed_break_secs: u64,
    pub session_start_time: Option<DateTime<Utc>>,
    /// Wall-clock time of the write that produced this snapshot.
    #[serde(rename = "lastSavedTime")]
    pub saved_at: DateTime<Utc>,
    /// Label chosen when the session started. Absent in older blobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl SessionSnapshot {
    /// The stored label, with defaults for missing parts.
    pub fn label(&self) -> SessionLabel {
        SessionLabel::new(
            self.activity_name.as_deref().unwrap_or(DEFAULT_ACTIVITY_NAME),
            self.emoji.as_deref().unwrap_or(DEFAULT_ACTIVITY_EMOJI),
        )
    }
}

/// A session rebuilt from a snapshot, suspended time included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredSession {
    pub state: TimerState,
    pub elapsed_focus_secs: u64,
    pub elapsed_break_secs: u64,
    pub session_start: Option<DateTime<Utc>>,
}

/// Reads and writes the timer snapshot.
///
/// The primary store is authoritative. The optional shared store mirrors
/// every write for read-only surfaces such as widgets; it is consulted on
/// read only when the primary has nothing.
pub struct SnapshotStore {
    primary: Rc<dyn KvStore>,
    shared: Option<Rc<dyn KvStore>>,
    clock: Rc<dyn Clock>,
}

impl SnapshotStore {
    pub fn new(primary: Rc<dyn KvStore>, clock: Rc<dyn Clock>) -> Self {
        Self {
            primary,
            shared: None,
            clock,
        }
    }

    pub fn with_shared(mut self, shared: Rc<dyn KvStore>) -> Self {
        self.shared = Some(shared);
        self
    }

    /// Write a snapshot stamped with the current time, swallowing failures.
    pub fn save(
        &self,
        state: TimerState,
        elapsed_focus_secs: u64,
        elapsed_break_secs: u64,
        session_start: Option<DateTime<Utc>>,
    ) {
        if let Err(e) = self.try_save(state, elapsed_focus_secs, elapsed_break_secs, session_start)
        {
            warn!(error = %e, "failed to persist timer snapshot");
        }
    }

    /// Write a snapshot, reporting a failure of the primary store.
    ///
    /// A shared-store failure is logged and does not fail the call.
    pub fn try_save(
        &self,
        state: TimerState,
        elapsed_focus_secs: u64,
        elapsed_break_secs: u64,
        session_start: Option<DateTime<Utc>>,
    ) -> Result<SessionSnapshot, StorageError> {
        let snapshot = SessionSnapshot {
            state,
            elapsed_focus_secs,
            elapsed_break_secs,
            session_start_time: session_start,
            saved_at: self.clock.now(),
            activity_name: None,
            emoji: None,
        };
        self.write(&snapshot)?;
        Ok(snapshot)
    }

    /// Store `snapshot` as is. `saved_at` is not restamped.
    pub fn write(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let json = serde_json::to_string(snapshot).map_err(|e| StorageError::Encode {
            key: SNAPSHOT_KEY.to_string(),
            message: e.to_string(),
        })?;

        self.primary.set(SNAPSHOT_KEY, &json)?;
        if let Some(shared) = &self.shared {
            if let Err(e) = shared.set(SNAPSHOT_KEY, &json) {
                warn!(error = %e, "shared snapshot store unavailable");
            }
        }
        debug!(
            state = snapshot.state.as_str(),
            focus = snapshot.elapsed_focus_secs,
            brk = snapshot.elapsed_break_secs,
            "snapshot saved"
        );
        Ok(())
    }

    /// The most recent snapshot, untouched.
    ///
    /// Read-only: observers may call this freely. Unreadable or undecodable
    /// data is reported as `None`.
    pub fn load(&self) -> Option<SessionSnapshot> {
        let raw = match self.primary.get(SNAPSHOT_KEY) {
            Ok(Some(raw)) => Some(raw),
            Ok(None) => self.load_shared(),
            Err(e) => {
                warn!(error = %e, "failed to read timer snapshot");
                self.load_shared()
            }
        }?;

        match serde_json::from_str::<SessionSnapshot>(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "discarding undecodable timer snapshot");
                None
            }
        }
    }

    fn load_shared(&self) -> Option<String> {
        let shared = self.shared.as_ref()?;
        match shared.get(SNAPSHOT_KEY) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to read shared timer snapshot");
                None
            }
        }
    }

    /// Rebuild the session from the last snapshot.
    ///
    /// Returns `None` when there is no snapshot or it was idle. The time
    /// between the snapshot's write and now (clamped at zero) is added to
    /// the accumulator that was running.
    pub fn restore(&self) -> Option<RestoredSession> {
        let snapshot = self.load()?;
        self.resume(&snapshot)
    }

    /// [`restore`](Self::restore) for a snapshot the caller already loaded.
    pub fn resume(&self, snapshot: &SessionSnapshot) -> Option<RestoredSession> {
        if snapshot.state == TimerState::Idle {
            return None;
        }

        let gap = suspended_secs(snapshot.saved_at, self.clock.now());
        let mut restored = RestoredSession {
            state: snapshot.state,
            elapsed_focus_secs: snapshot.elapsed_focus_secs,
            elapsed_break_secs: snapshot.elapsed_break_secs,
            session_start: snapshot.session_start_time,
        };
        match snapshot.state {
            TimerState::Running => restored.elapsed_focus_secs += gap,
            TimerState::OnBreak => restored.elapsed_break_secs += gap,
            TimerState::Idle => {}
        }
        debug!(state = snapshot.state.as_str(), gap, "snapshot restored");
        Some(restored)
    }

    /// Delete the snapshot everywhere. Idempotent.
    pub fn clear(&self) {
        if let Err(e) = self.primary.remove(SNAPSHOT_KEY) {
            warn!(error = %e, "failed to clear timer snapshot");
        }
        if let Some(shared) = &self.shared {
            if let Err(e) = shared.remove(SNAPSHOT_KEY) {
                warn!(error = %e, "failed to clear shared timer snapshot");
            }
        }
    }
}

/// Whole seconds from `saved_at` to `now`; clock skew counts as zero.
fn suspended_secs(saved_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - saved_at).num_seconds().max(0) as u64
}
