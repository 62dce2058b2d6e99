//! Completed focus sessions and their history.
//!
//! An [`ActivityRecord`] exists only after the user confirms a stopped
//! session. Records are never edited; the log supports add and delete.
//! The whole history is stored as one JSON array under `SavedActivities`,
//! newest first.

use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::CalendarContext;
use crate::display::format_clock;
use crate::error::{CoreError, ValidationError};
use crate::storage::KvStore;
use crate::timer::PendingSession;

pub const ACTIVITIES_KEY: &str = "SavedActivities";
pub const DEFAULT_ACTIVITY_NAME: &str = "Focus Session";
pub const DEFAULT_ACTIVITY_EMOJI: &str = "🎯";

/// Name and emoji supplied at the confirmation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLabel {
    pub name: String,
    pub emoji: String,
}

impl SessionLabel {
    pub fn new(name: impl Into<String>, emoji: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            emoji: emoji.into(),
        }
    }

    /// Blank fields fall back to the defaults.
    fn resolve(self) -> (String, String) {
        let name = self.name.trim();
        let name = if name.is_empty() {
            DEFAULT_ACTIVITY_NAME.to_string()
        } else {
            name.to_string()
        };
        let emoji = self.emoji.trim();
        let emoji = if emoji.is_empty() {
            DEFAULT_ACTIVITY_EMOJI.to_string()
        } else {
            emoji.to_string()
        };
        (name, emoji)
    }
}

impl Default for SessionLabel {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_NAME, DEFAULT_ACTIVITY_EMOJI)
    }
}

/// One confirmed focus session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: Uuid,
    pub name: String,
    pub emoji: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub focus_duration_secs: u64,
    #[serde(rename = "breakDuration")]
    pub break_duration_secs: u64,
}

impl ActivityRecord {
    /// Build a record with a fresh id.
    ///
    /// # Errors
    /// Returns an error if `end_time` precedes `start_time`.
    pub fn new(
        label: SessionLabel,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        focus_duration_secs: u64,
        break_duration_secs: u64,
    ) -> Result<Self, ValidationError> {
        if end_time < start_time {
            return Err(ValidationError::InvalidTimeRange {
                start: start_time,
                end: end_time,
            });
        }
        let (name, emoji) = label.resolve();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            emoji,
            start_time,
            end_time,
            focus_duration_secs,
            break_duration_secs,
        })
    }

    pub fn from_pending(pending: &PendingSession, label: SessionLabel) -> Result<Self, ValidationError> {
        Self::new(
            label,
            pending.start_time,
            pending.end_time,
            pending.focus_secs,
            pending.break_secs,
        )
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.focus_duration_secs + self.break_duration_secs
    }

    /// Share of the session spent focusing; 100 for an empty session.
    pub fn focus_percentage(&self) -> f64 {
        let total = self.total_duration_secs();
        if total == 0 {
            return 100.0;
        }
        self.focus_duration_secs as f64 / total as f64 * 100.0
    }

    pub fn break_percentage(&self) -> f64 {
        let total = self.total_duration_secs();
        if total == 0 {
            return 0.0;
        }
        self.break_duration_secs as f64 / total as f64 * 100.0
    }

    pub fn spans_multiple_days(&self, calendar: &CalendarContext) -> bool {
        !calendar.same_day(self.start_time, self.end_time)
    }

    pub fn formatted_duration(&self) -> String {
        format_clock(self.focus_duration_secs)
    }

    /// Always `MM:SS`; minutes keep counting past 59.
    pub fn formatted_break_duration(&self) -> String {
        let minutes = self.break_duration_secs / 60;
        let seconds = self.break_duration_secs % 60;
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Window used by [`ActivityLog::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    /// Sessions started on the current calendar day.
    Today,
    /// Sessions started within the last seven days.
    Week,
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityStats {
    pub period: StatsPeriod,
    pub total_sessions: u64,
    pub total_focus_min: u64,
    pub total_break_min: u64,
    pub average_session_min: u64,
    pub focus_percentage: f64,
}

impl ActivityStats {
    pub fn from_records<'a>(
        period: StatsPeriod,
        records: impl IntoIterator<Item = &'a ActivityRecord>,
    ) -> Self {
        let mut total_sessions = 0u64;
        let mut focus_secs = 0u64;
        let mut break_secs = 0u64;
        for record in records {
            total_sessions += 1;
            focus_secs += record.focus_duration_secs;
            break_secs += record.break_duration_secs;
        }

        let total_focus_min = focus_secs / 60;
        let average_session_min = if total_sessions == 0 {
            0
        } else {
            total_focus_min / total_sessions
        };
        let focus_percentage = if focus_secs + break_secs == 0 {
            100.0
        } else {
            focus_secs as f64 / (focus_secs + break_secs) as f64 * 100.0
        };

        Self {
            period,
            total_sessions,
            total_focus_min,
            total_break_min: break_secs / 60,
            average_session_min,
            focus_percentage,
        }
    }
}

/// Append-only history of confirmed sessions, newest first.
pub struct ActivityLog {
    kv: Rc<dyn KvStore>,
    /// Best-effort mirror read by widget surfaces.
    shared: Option<Rc<dyn KvStore>>,
    records: Vec<ActivityRecord>,
}

impl ActivityLog {
    /// Load the history. A missing or undecodable blob starts an empty log.
    pub fn load(kv: Rc<dyn KvStore>) -> Self {
        Self::load_with_shared(kv, None)
    }

    /// Load the history, falling back to `shared` when the primary store
    /// has none. Every later write is mirrored to `shared`.
    pub fn load_with_shared(kv: Rc<dyn KvStore>, shared: Option<Rc<dyn KvStore>>) -> Self {
        let raw = match kv.get(ACTIVITIES_KEY) {
            Ok(Some(raw)) => Some(raw),
            Ok(None) => read_shared(shared.as_deref()),
            Err(e) => {
                warn!(error = %e, "failed to read activity history");
                read_shared(shared.as_deref())
            }
        };
        let records = match raw {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "discarding undecodable activity history");
                Vec::new()
            }),
            None => Vec::new(),
        };
        Self { kv, shared, records }
    }

    pub fn list(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&ActivityRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Insert at the front and persist.
    ///
    /// # Errors
    /// Returns an error if the history cannot be written; the log is left
    /// unchanged in that case.
    pub fn add(&mut self, record: ActivityRecord) -> Result<(), CoreError> {
        self.records.insert(0, record);
        if let Err(e) = self.persist() {
            self.records.remove(0);
            return Err(e);
        }
        if let Some(record) = self.records.first() {
            info!(id = %record.id, name = %record.name, focus = record.focus_duration_secs, "activity saved");
        }
        Ok(())
    }

    /// Remove the record with `id`. Returns whether one was removed.
    pub fn delete(&mut self, id: Uuid) -> Result<bool, CoreError> {
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        let removed = self.records.remove(index);
        if let Err(e) = self.persist() {
            self.records.insert(index, removed);
            return Err(e);
        }
        info!(%id, "activity deleted");
        Ok(true)
    }

    /// Records grouped by the calendar day they started on, newest day first.
    pub fn group_by_day(&self, calendar: &CalendarContext) -> Vec<(NaiveDate, Vec<&ActivityRecord>)> {
        let mut days: BTreeMap<NaiveDate, Vec<&ActivityRecord>> = BTreeMap::new();
        for record in &self.records {
            days.entry(calendar.day_of(record.start_time))
                .or_default()
                .push(record);
        }
        days.into_iter().rev().collect()
    }

    pub fn stats(
        &self,
        period: StatsPeriod,
        now: DateTime<Utc>,
        calendar: &CalendarContext,
    ) -> ActivityStats {
        let today = calendar.day_of(now);
        let week_ago = now - Duration::days(7);
        let in_period = |r: &&ActivityRecord| match period {
            StatsPeriod::Today => calendar.day_of(r.start_time) == today,
            StatsPeriod::Week => r.start_time >= week_ago,
            StatsPeriod::All => true,
        };
        ActivityStats::from_records(period, self.records.iter().filter(in_period))
    }

    fn persist(&self) -> Result<(), CoreError> {
        let json = serde_json::to_string(&self.records)?;
        self.kv.set(ACTIVITIES_KEY, &json)?;
        if let Some(shared) = &self.shared {
            if let Err(e) = shared.set(ACTIVITIES_KEY, &json) {
                warn!(error = %e, "shared activity store unavailable");
            }
        }
        Ok(())
    }
}

fn read_shared(shared: Option<&dyn KvStore>) -> Option<String> {
    match shared?.get(ACTIVITIES_KEY) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "failed to read shared activity history");
            None
        }
    }
}
