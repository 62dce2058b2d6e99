//! Daily focus streaks.
//!
//! A day counts toward the streak once it holds a session with at least
//! [`MIN_FOCUS_MINUTES`] of focus. The first qualifying session of a day
//! extends the streak when the previous qualifying day was yesterday and
//! restarts it at 1 otherwise; later sessions on the same day change
//! nothing. Days are calendar days in the injected [`CalendarContext`], so a
//! session at 23:58 and another at 00:02 are one day apart.
//!
//! State is kept as three independent scalar entries (`CurrentStreak`,
//! `LongestStreak`, `LastStreakDate`).

use std::rc::Rc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::activity::ActivityRecord;
use crate::clock::CalendarContext;
use crate::storage::KvStore;

/// Minimum focus for a session to count toward the streak.
pub const MIN_FOCUS_MINUTES: u64 = 15;

pub const CURRENT_STREAK_KEY: &str = "CurrentStreak";
pub const LONGEST_STREAK_KEY: &str = "LongestStreak";
pub const LAST_STREAK_DATE_KEY: &str = "LastStreakDate";

const DATE_FORMAT: &str = "%Y-%m-%d";

const HEADERS: [&str; 10] = [
    "Keep the momentum going! 🔥",
    "You're unstoppable! 💪",
    "Consistency is key! ⭐",
    "Building greatness, one day at a time! 🌟",
    "You're on fire! 🔥",
    "Every day counts! 📈",
    "Small steps, big results! 🚀",
    "You're crushing it! 💯",
    "The streak continues! ⚡",
    "Excellence is a habit! ✨",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakState {
    pub current: u32,
    pub longest: u32,
    pub last_qualifying_day: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum StreakUpdate {
    /// The day was already counted.
    NotNew,
    /// The day was counted now; `streak` is the new current streak.
    NewStreakDay { streak: u32 },
}

impl StreakUpdate {
    pub fn is_new_day(&self) -> bool {
        matches!(self, StreakUpdate::NewStreakDay { .. })
    }
}

/// Header and sub-header of the streak celebration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakMessage {
    pub header: String,
    pub sub_header: String,
}

/// Owns and persists the [`StreakState`].
pub struct StreakTracker {
    kv: Rc<dyn KvStore>,
    calendar: CalendarContext,
    state: StreakState,
}

impl StreakTracker {
    /// Load the counters. Missing or unreadable entries start at zero.
    pub fn load(kv: Rc<dyn KvStore>, calendar: CalendarContext) -> Self {
        let current = read_scalar::<u32>(kv.as_ref(), CURRENT_STREAK_KEY).unwrap_or(0);
        let longest = read_scalar::<u32>(kv.as_ref(), LONGEST_STREAK_KEY).unwrap_or(0);
        let last_qualifying_day = read_raw(kv.as_ref(), LAST_STREAK_DATE_KEY).and_then(|raw| {
            NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                .map_err(|e| warn!(error = %e, "discarding unreadable streak date"))
                .ok()
        });
        let state = StreakState {
            current,
            longest: longest.max(current),
            last_qualifying_day,
        };
        Self {
            kv,
            calendar,
            state,
        }
    }

    pub fn state(&self) -> StreakState {
        self.state
    }

    pub fn calendar(&self) -> CalendarContext {
        self.calendar
    }

    /// Whether a session with this much focus counts toward the streak.
    pub fn qualifies(focus_duration_secs: u64) -> bool {
        focus_duration_secs / 60 >= MIN_FOCUS_MINUTES
    }

    /// Count the calendar day `activity_start` falls on.
    ///
    /// Callers must only pass sessions that [`qualify`](Self::qualifies);
    /// [`record`](Self::record) does that check.
    pub fn evaluate(&mut self, activity_start: DateTime<Utc>) -> StreakUpdate {
        let day = self.calendar.day_of(activity_start);

        let current = match self.state.last_qualifying_day {
            Some(last) if last == day => {
                debug!(%day, "streak day already counted");
                return StreakUpdate::NotNew;
            }
            Some(last) if self.calendar.days_between(last, day) == 1 => self.state.current + 1,
            // First qualifying day ever, a gap, or a day before the last one.
            _ => 1,
        };

        self.state.current = current;
        self.state.longest = self.state.longest.max(current);
        self.state.last_qualifying_day = Some(day);
        self.persist();
        info!(%day, streak = current, longest = self.state.longest, "new streak day");
        StreakUpdate::NewStreakDay { streak: current }
    }

    /// Evaluate a finished activity if it qualifies.
    ///
    /// Returns `None` (and leaves the state alone) for short sessions.
    pub fn record(&mut self, activity: &ActivityRecord) -> Option<StreakUpdate> {
        if !Self::qualifies(activity.focus_duration_secs) {
            debug!(focus = activity.focus_duration_secs, "session too short for streak");
            return None;
        }
        Some(self.evaluate(activity.start_time))
    }

    /// Celebration text for a streak of `streak_count` days.
    pub fn message(streak_count: u32) -> StreakMessage {
        let index = streak_count as usize % HEADERS.len();
        let n = streak_count;
        let sub_header = match index {
            0 => format!("Another streak in the books! Let's continue... the {n} day streak"),
            1 => format!("You're on fire! Welcome, {n} day streak!"),
            2 => format!("Incredible! {n} days of focus and counting!"),
            3 => format!("Amazing work! Your {n} day streak is inspiring!"),
            4 => format!("Unstoppable! {n} days strong and growing!"),
            5 => format!("Phenomenal! Keep the {n} day streak alive!"),
            6 => format!("Outstanding! {n} days of dedication!"),
            7 => format!("Remarkable! Your {n} day streak shows real commitment!"),
            8 => format!("Exceptional! {n} days and still going strong!"),
            _ => format!("Incredible! The {n} day streak continues!"),
        };
        StreakMessage {
            header: HEADERS[index].to_string(),
            sub_header,
        }
    }

    fn persist(&self) {
        let mut writes = vec![
            (CURRENT_STREAK_KEY, self.state.current.to_string()),
            (LONGEST_STREAK_KEY, self.state.longest.to_string()),
        ];
        if let Some(day) = self.state.last_qualifying_day {
            writes.push((LAST_STREAK_DATE_KEY, day.format(DATE_FORMAT).to_string()));
        }
        for (key, value) in writes {
            if let Err(e) = self.kv.set(key, &value) {
                warn!(key, error = %e, "failed to persist streak");
            }
        }
    }
}

fn read_raw(kv: &dyn KvStore, key: &str) -> Option<String> {
    match kv.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "failed to read streak entry");
            None
        }
    }
}

fn read_scalar<T: std::str::FromStr>(kv: &dyn KvStore, key: &str) -> Option<T> {
    let raw = read_raw(kv, key)?;
    let parsed = raw.trim().parse::<T>().ok();
    if parsed.is_none() {
        warn!(key, value = %raw, "discarding unreadable streak entry");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::SessionLabel;
    use crate::storage::MemoryKv;
    use chrono::Duration;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn tracker() -> (Rc<MemoryKv>, StreakTracker) {
        let kv = Rc::new(MemoryKv::new());
        let tracker = StreakTracker::load(kv.clone(), CalendarContext::utc());
        (kv, tracker)
    }

    #[test]
    fn qualifies_at_fifteen_minutes() {
        assert!(!StreakTracker::qualifies(0));
        assert!(!StreakTracker::qualifies(14 * 60));
        assert!(!StreakTracker::qualifies(15 * 60 - 1));
        assert!(StreakTracker::qualifies(15 * 60));
        assert!(StreakTracker::qualifies(3 * 3600));
    }

    #[test]
    fn first_qualifying_day_starts_at_one() {
        let (_kv, mut t) = tracker();
        assert_eq!(
            t.evaluate(at("2025-03-12T09:00:00Z")),
            StreakUpdate::NewStreakDay { streak: 1 }
        );
        assert_eq!(t.state().current, 1);
        assert_eq!(t.state().longest, 1);
    }

    #[test]
    fn consecutive_days_extend() {
        let (_kv, mut t) = tracker();
        t.evaluate(at("2025-03-12T09:00:00Z"));
        assert_eq!(
            t.evaluate(at("2025-03-13T21:00:00Z")),
            StreakUpdate::NewStreakDay { streak: 2 }
        );
        assert_eq!(t.state().longest, 2);
    }

    #[test]
    fn same_day_is_not_new() {
        let (_kv, mut t) = tracker();
        t.evaluate(at("2025-03-12T09:00:00Z"));
        assert_eq!(t.evaluate(at("2025-03-12T22:00:00Z")), StreakUpdate::NotNew);
        assert_eq!(t.state().current, 1);
    }

    #[test]
    fn gap_resets_but_keeps_longest() {
        let (_kv, mut t) = tracker();
        t.evaluate(at("2025-03-10T09:00:00Z"));
        t.evaluate(at("2025-03-11T09:00:00Z"));
        t.evaluate(at("2025-03-12T09:00:00Z"));
        assert_eq!(
            t.evaluate(at("2025-03-15T09:00:00Z")),
            StreakUpdate::NewStreakDay { streak: 1 }
        );
        assert_eq!(t.state().current, 1);
        assert_eq!(t.state().longest, 3);
    }

    #[test]
    fn earlier_day_resets() {
        let (_kv, mut t) = tracker();
        t.evaluate(at("2025-03-12T09:00:00Z"));
        t.evaluate(at("2025-03-13T09:00:00Z"));
        assert_eq!(
            t.evaluate(at("2025-03-11T09:00:00Z")),
            StreakUpdate::NewStreakDay { streak: 1 }
        );
        assert_eq!(
            t.state().last_qualifying_day,
            NaiveDate::from_ymd_opt(2025, 3, 11)
        );
    }

    #[test]
    fn midnight_crossing_is_one_calendar_day() {
        let (_kv, mut t) = tracker();
        t.evaluate(at("2025-03-12T23:58:00Z"));
        assert_eq!(
            t.evaluate(at("2025-03-13T00:02:00Z")),
            StreakUpdate::NewStreakDay { streak: 2 }
        );
    }

    #[test]
    fn day_boundary_follows_injected_calendar() {
        let kv = Rc::new(MemoryKv::new());
        // UTC-5: 03:00Z on the 13th is still the 12th locally.
        let cal = CalendarContext::from_offset_minutes(-5 * 60).unwrap();
        let mut t = StreakTracker::load(kv, cal);
        t.evaluate(at("2025-03-12T15:00:00Z"));
        assert_eq!(t.evaluate(at("2025-03-13T03:00:00Z")), StreakUpdate::NotNew);
    }

    #[test]
    fn short_sessions_never_touch_state() {
        let (kv, mut t) = tracker();
        let start = at("2025-03-12T09:00:00Z");
        let short = ActivityRecord::new(
            SessionLabel::default(),
            start,
            start + Duration::minutes(14),
            14 * 60,
            0,
        )
        .unwrap();
        assert_eq!(t.record(&short), None);
        assert_eq!(t.state(), StreakState::default());
        assert!(kv.is_empty());
    }

    #[test]
    fn state_survives_reload() {
        let (kv, mut t) = tracker();
        t.evaluate(at("2025-03-12T09:00:00Z"));
        t.evaluate(at("2025-03-13T09:00:00Z"));

        assert_eq!(kv.get(CURRENT_STREAK_KEY).unwrap().as_deref(), Some("2"));
        assert_eq!(kv.get(LAST_STREAK_DATE_KEY).unwrap().as_deref(), Some("2025-03-13"));

        let mut reloaded = StreakTracker::load(kv, CalendarContext::utc());
        assert_eq!(reloaded.state(), t.state());
        assert_eq!(
            reloaded.evaluate(at("2025-03-14T09:00:00Z")),
            StreakUpdate::NewStreakDay { streak: 3 }
        );
    }

    #[test]
    fn unreadable_entries_load_as_defaults() {
        let kv = Rc::new(MemoryKv::new());
        kv.set(CURRENT_STREAK_KEY, "lots").unwrap();
        kv.set(LONGEST_STREAK_KEY, "-4").unwrap();
        kv.set(LAST_STREAK_DATE_KEY, "yesterday").unwrap();
        let t = StreakTracker::load(kv, CalendarContext::utc());
        assert_eq!(t.state(), StreakState::default());
    }

    #[test]
    fn write_failure_keeps_in_memory_state() {
        let (kv, mut t) = tracker();
        kv.set_read_only(true);
        assert!(t.evaluate(at("2025-03-12T09:00:00Z")).is_new_day());
        assert_eq!(t.state().current, 1);
    }

    #[test]
    fn message_is_deterministic_and_cycles() {
        let first = StreakTracker::message(3);
        assert_eq!(first, StreakTracker::message(3));
        assert_eq!(first.header, "Building greatness, one day at a time! 🌟");
        assert!(first.sub_header.contains("3 day streak"));

        assert_eq!(StreakTracker::message(1).header, StreakTracker::message(11).header);
        assert!(StreakTracker::message(11).sub_header.contains("11"));
        assert_eq!(StreakTracker::message(0).header, "Keep the momentum going! 🔥");
    }
}
