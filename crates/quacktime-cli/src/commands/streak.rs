use clap::Subcommand;
use quacktime_core::StreakTracker;

use super::{load_config, open_session, CommandResult};

#[derive(Subcommand)]
pub enum StreakAction {
    /// Print current and longest streak as JSON
    Show,
    /// Print the celebration message for a streak count
    Message {
        /// Streak length in days
        count: u32,
    },
}

pub fn run(action: StreakAction) -> CommandResult {
    match action {
        StreakAction::Show => {
            let config = load_config();
            let session = open_session(&config)?;
            println!("{}", serde_json::to_string_pretty(&session.streaks().state())?);
        }
        StreakAction::Message { count } => {
            let message = StreakTracker::message(count);
            println!("{}", serde_json::to_string_pretty(&message)?);
        }
    }
    Ok(())
}
