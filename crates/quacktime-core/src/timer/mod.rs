mod engine;

pub use engine::{PendingSession, SessionTimer, TimerState};
