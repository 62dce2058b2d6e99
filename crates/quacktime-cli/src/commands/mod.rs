pub mod activity;
pub mod config;
pub mod stats;
pub mod streak;
pub mod timer;
pub mod todo;

use std::rc::Rc;

use quacktime_core::storage::Database;
use quacktime_core::{
    ActivityLog, Config, FocusSession, KvStore, LogDisplay, SnapshotStore, StreakTracker,
    SystemClock,
};
use tracing::warn;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Open the on-disk stores and assemble a session around them.
pub fn open_session(config: &Config) -> Result<FocusSession, Box<dyn std::error::Error>> {
    let kv: Rc<dyn KvStore> = Rc::new(Database::open()?);
    let clock = Rc::new(SystemClock);

    let shared: Option<Rc<dyn KvStore>> = if config.storage.shared_store {
        match Database::open_shared() {
            Ok(shared) => Some(Rc::new(shared) as Rc<dyn KvStore>),
            Err(e) => {
                warn!(error = %e, "shared store unavailable");
                None
            }
        }
    } else {
        None
    };

    let mut snapshots = SnapshotStore::new(kv.clone(), clock.clone());
    if let Some(shared) = &shared {
        snapshots = snapshots.with_shared(shared.clone());
    }
    let activities = ActivityLog::load_with_shared(kv.clone(), shared);
    let streaks = StreakTracker::load(kv, config.calendar());
    let session = FocusSession::new(snapshots, activities, streaks, clock);
    Ok(if config.display.log_ticks {
        session.with_display(Box::new(LogDisplay))
    } else {
        session
    })
}

/// Load the config, falling back to defaults with a warning.
pub fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "using default config");
        Config::default()
    })
}
