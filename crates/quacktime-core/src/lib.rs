//! # Quacktime Core Library
//!
//! Core logic for the Quacktime focus tracker: a count-up session timer with
//! breaks, a persisted history of finished sessions, and a daily streak.
//! The `quacktime` CLI is a thin shell over this crate.
//!
//! ## Architecture
//!
//! - **Timer**: a tick-driven state machine (`Idle`, `Running`, `OnBreak`)
//!   that accumulates focus and break seconds.
//! - **Snapshot**: the timer persisted after every transition and tick, and
//!   restored on relaunch with the suspended time credited.
//! - **Activity log**: finished sessions, grouped by day and summarised.
//! - **Streak**: consecutive calendar days with a qualifying session.
//! - **Todo**: to-do items in user-defined groups.
//! - **Storage**: a SQLite key-value table and TOML configuration.
//!
//! ## Key Components
//!
//! - [`FocusSession`]: owns the timer and is the single writer of all state
//! - [`SessionTimer`]: the state machine itself
//! - [`ActivityLog`] / [`StreakTracker`]: history and streak persistence
//! - [`Database`] / [`Config`]: storage and configuration

pub mod activity;
pub mod clock;
pub mod display;
pub mod error;
pub mod events;
pub mod session;
pub mod snapshot;
pub mod storage;
pub mod streak;
pub mod timer;
pub mod todo;

pub use activity::{ActivityLog, ActivityRecord, ActivityStats, SessionLabel, StatsPeriod};
pub use clock::{CalendarContext, Clock, ManualClock, SystemClock};
pub use display::{DisplayPublisher, DisplayState, LogDisplay, NullDisplay};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use session::{FocusSession, SessionOutcome, StreakCelebration};
pub use snapshot::{RestoredSession, SessionSnapshot, SnapshotStore};
pub use storage::{Config, Database, KvStore, MemoryKv};
pub use streak::{StreakMessage, StreakState, StreakTracker, StreakUpdate};
pub use timer::{PendingSession, SessionTimer, TimerState};
pub use todo::{TodoGroup, TodoItem, TodoList};
