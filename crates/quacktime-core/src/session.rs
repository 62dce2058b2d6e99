//! The focus session: timer, persistence, history and streaks wired together.
//!
//! [`FocusSession`] is the single writer of the timer snapshot, the activity
//! history and the streak counters. Every collaborator (stores, clock,
//! calendar, display) is handed in by the host; nothing here reaches for a
//! process-wide instance.
//!
//! ## Lifecycle
//!
//! ```ignore
//! let mut session = FocusSession::open(kv, clock, calendar);
//! session.enter_foreground();           // restore, crediting suspended time
//! session.start(SessionLabel::default());
//! // once per second:
//! session.tick();
//! let pending = session.stop().unwrap();
//! let outcome = session.confirm(pending, SessionLabel::new("Study", "📚"))?;
//! session.enter_background();           // save
//! ```

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::activity::{ActivityLog, ActivityRecord, SessionLabel};
use crate::clock::{CalendarContext, Clock};
use crate::display::{DisplayPublisher, DisplayState, NullDisplay};
use crate::error::CoreError;
use crate::events::Event;
use crate::snapshot::{SessionSnapshot, SnapshotStore};
use crate::storage::KvStore;
use crate::streak::{StreakTracker, StreakUpdate};
use crate::timer::{PendingSession, SessionTimer, TimerState};

/// Data for the "new streak day" popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakCelebration {
    pub streak: u32,
    pub header: String,
    pub sub_header: String,
}

/// Result of confirming a stopped session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub activity: ActivityRecord,
    /// `None` when the session was too short to count toward the streak.
    pub streak: Option<StreakUpdate>,
    /// Present only for the first qualifying session of a day.
    pub celebration: Option<StreakCelebration>,
    pub events: Vec<Event>,
}

pub struct FocusSession {
    timer: SessionTimer,
    label: SessionLabel,
    snapshots: SnapshotStore,
    activities: ActivityLog,
    streaks: StreakTracker,
    clock: Rc<dyn Clock>,
    display: Box<dyn DisplayPublisher>,
    /// The snapshot this session last read from or wrote to the store.
    last_snapshot: Option<SessionSnapshot>,
}

impl FocusSession {
    pub fn new(
        snapshots: SnapshotStore,
        activities: ActivityLog,
        streaks: StreakTracker,
        clock: Rc<dyn Clock>,
    ) -> Self {
        Self {
            timer: SessionTimer::new(),
            label: SessionLabel::default(),
            snapshots,
            activities,
            streaks,
            clock,
            display: Box::new(NullDisplay),
            last_snapshot: None,
        }
    }

    /// Build every component on top of one key-value store.
    pub fn open(kv: Rc<dyn KvStore>, clock: Rc<dyn Clock>, calendar: CalendarContext) -> Self {
        let snapshots = SnapshotStore::new(kv.clone(), clock.clone());
        let activities = ActivityLog::load(kv.clone());
        let streaks = StreakTracker::load(kv, calendar);
        Self::new(snapshots, activities, streaks, clock)
    }

    pub fn with_display(mut self, display: Box<dyn DisplayPublisher>) -> Self {
        self.display = display;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    pub fn label(&self) -> &SessionLabel {
        &self.label
    }

    pub fn activities(&self) -> &ActivityLog {
        &self.activities
    }

    pub fn activities_mut(&mut self) -> &mut ActivityLog {
        &mut self.activities
    }

    pub fn streaks(&self) -> &StreakTracker {
        &self.streaks
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn status(&self) -> Event {
        self.timer.snapshot(self.clock.now())
    }

    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            activity_name: self.label.name.clone(),
            emoji: self.label.emoji.clone(),
            state: self.timer.state(),
            elapsed_focus_secs: self.timer.elapsed_focus_secs(),
            elapsed_break_secs: self.timer.elapsed_break_secs(),
            session_start: self.timer.session_start(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, label: SessionLabel) -> Option<Event> {
        let event = self.timer.start(self.clock.now())?;
        self.label = label;
        info!(name = %self.label.name, "session started");
        self.save();
        self.publish();
        Some(event)
    }

    /// One second of the tick source. Returns `false` while idle.
    pub fn tick(&mut self) -> bool {
        if !self.timer.tick() {
            return false;
        }
        self.save();
        self.publish();
        true
    }

    pub fn toggle_break(&mut self) -> Option<Event> {
        let event = self.timer.toggle_break(self.clock.now())?;
        info!(state = self.timer.state().as_str(), "break toggled");
        self.save();
        self.publish();
        Some(event)
    }

    /// Break request coming from a display surface. Only honoured while
    /// focusing; ending a break is left to the main controls.
    pub fn request_break_toggle(&mut self) -> Option<Event> {
        if self.timer.state() != TimerState::Running {
            debug!("break request ignored: not running");
            return None;
        }
        self.toggle_break()
    }

    /// Halt the session. The returned [`PendingSession`] must be passed to
    /// either [`confirm`](Self::confirm) or [`discard`](Self::discard).
    pub fn stop(&mut self) -> Option<PendingSession> {
        let pending = self.timer.stop(self.clock.now())?;
        info!(
            focus = pending.focus_secs,
            brk = pending.break_secs,
            "session stopped"
        );
        self.save();
        self.display.end();
        Some(pending)
    }

    /// Turn a stopped session into an activity and evaluate the streak.
    ///
    /// # Errors
    /// Returns an error if the record is invalid or the history cannot be
    /// written. The snapshot is cleared either way.
    pub fn confirm(
        &mut self,
        pending: PendingSession,
        label: SessionLabel,
    ) -> Result<SessionOutcome, CoreError> {
        self.clear_snapshot();
        self.label = SessionLabel::default();

        let activity = ActivityRecord::from_pending(&pending, label)?;
        self.activities.add(activity.clone())?;

        let now = self.clock.now();
        let mut events = vec![Event::ActivitySaved {
            id: activity.id,
            name: activity.name.clone(),
            emoji: activity.emoji.clone(),
            focus_secs: activity.focus_duration_secs,
            break_secs: activity.break_duration_secs,
            at: now,
        }];

        let streak = self.streaks.record(&activity);
        let celebration = match streak {
            Some(StreakUpdate::NewStreakDay { streak }) => {
                let message = StreakTracker::message(streak);
                events.push(Event::StreakDay {
                    streak,
                    header: message.header.clone(),
                    sub_header: message.sub_header.clone(),
                    at: now,
                });
                Some(StreakCelebration {
                    streak,
                    header: message.header,
                    sub_header: message.sub_header,
                })
            }
            _ => None,
        };

        Ok(SessionOutcome {
            activity,
            streak,
            celebration,
            events,
        })
    }

    /// Drop a stopped session without recording it.
    pub fn discard(&mut self, pending: PendingSession) -> Event {
        self.clear_snapshot();
        self.label = SessionLabel::default();
        info!(focus = pending.focus_secs, "stopped session discarded");
        Event::SessionDiscarded {
            focus_secs: pending.focus_secs,
            break_secs: pending.break_secs,
            at: self.clock.now(),
        }
    }

    /// Throw the active session away. Callers confirm with the user first.
    pub fn reset(&mut self) -> Option<Event> {
        let event = self.timer.reset(self.clock.now())?;
        self.label = SessionLabel::default();
        self.clear_snapshot();
        self.display.end();
        info!("session reset");
        Some(event)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Recover the session from the last snapshot. Call once when the app
    /// comes to the foreground, before the tick source resumes.
    pub fn enter_foreground(&mut self) -> Option<Event> {
        let snapshot = self.snapshots.load();
        self.last_snapshot = snapshot.clone();
        let snapshot = snapshot?;
        let restored = self.snapshots.resume(&snapshot)?;

        let event = self.timer.restore(&restored, self.clock.now());
        self.label = snapshot.label();
        info!(
            state = restored.state.as_str(),
            focus = restored.elapsed_focus_secs,
            brk = restored.elapsed_break_secs,
            "session restored"
        );
        self.publish();
        Some(event)
    }

    /// Persist the current state. Call once when the app leaves the
    /// foreground.
    ///
    /// Skipped when another writer replaced the snapshot in the meantime,
    /// so a stopped or reset session is never written back.
    pub fn enter_background(&mut self) {
        if self.store_changed() {
            warn!("snapshot changed by another writer; not saving");
            return;
        }
        self.save();
    }

    /// Whether the stored snapshot differs from the one this session last
    /// read or wrote.
    pub fn store_changed(&self) -> bool {
        self.snapshots.load() != self.last_snapshot
    }

    /// Drop the in-memory session and adopt whatever the store holds now.
    pub fn reload(&mut self) -> Option<Event> {
        self.timer = SessionTimer::new();
        self.label = SessionLabel::default();
        self.enter_foreground()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn save(&mut self) {
        let state = self.timer.state();
        let (activity_name, emoji) = if state.is_active() {
            (Some(self.label.name.clone()), Some(self.label.emoji.clone()))
        } else {
            (None, None)
        };
        let snapshot = SessionSnapshot {
            state,
            elapsed_focus_secs: self.timer.elapsed_focus_secs(),
            elapsed_break_secs: self.timer.elapsed_break_secs(),
            session_start_time: self.timer.session_start(),
            saved_at: self.clock.now(),
            activity_name,
            emoji,
        };
        match self.snapshots.write(&snapshot) {
            Ok(()) => self.last_snapshot = Some(snapshot),
            Err(e) => warn!(error = %e, "failed to persist timer snapshot"),
        }
    }

    fn clear_snapshot(&mut self) {
        self.snapshots.clear();
        self.last_snapshot = None;
    }

    fn publish(&mut self) {
        if self.timer.state().is_active() {
            let state = self.display_state();
            self.display.publish(&state);
        }
    }
}
