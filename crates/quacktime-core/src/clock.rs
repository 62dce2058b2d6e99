//! Wall-clock and calendar context.
//!
//! Nothing in the core reads the system clock or the system time zone
//! directly. A [`Clock`] supplies "now" and a [`CalendarContext`] turns
//! instants into calendar days, so tests can move time and cross midnight
//! deterministically.

use std::cell::Cell;

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Offset, TimeZone, Utc};

/// Source of the current wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.now.set(at);
    }

    /// Move the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Time zone used for calendar-day arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarContext {
    /// The host's local time zone.
    #[default]
    Local,
    /// A fixed UTC offset.
    Fixed(FixedOffset),
}

impl CalendarContext {
    pub fn utc() -> Self {
        CalendarContext::Fixed(Utc.fix())
    }

    /// Build a fixed-offset context. Returns `None` for offsets outside ±24h.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(CalendarContext::Fixed)
    }

    /// The calendar day `at` falls on in this context.
    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        match self {
            CalendarContext::Local => at.with_timezone(&Local).date_naive(),
            CalendarContext::Fixed(offset) => at.with_timezone(offset).date_naive(),
        }
    }

    /// Whole calendar days from `from` to `to` (negative when `to` is earlier).
    pub fn days_between(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        (to - from).num_days()
    }

    pub fn same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.day_of(a) == self.day_of(b)
    }

    /// Midnight at the start of `day`, as an instant.
    pub fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        let midnight = day.and_time(chrono::NaiveTime::MIN);
        match self {
            CalendarContext::Local => Local
                .from_local_datetime(&midnight)
                .earliest()
                .map(|t| t.with_timezone(&Utc))
                // Midnight skipped by a DST jump; the naive instant is close enough.
                .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
            CalendarContext::Fixed(offset) => offset
                .from_local_datetime(&midnight)
                .single()
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&midnight)),
        }
    }
}
