use clap::Subcommand;
use quacktime_core::{Clock, StatsPeriod, SystemClock};

use super::{load_config, open_session, CommandResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// Stats for the last seven days
    Week,
    /// All-time stats
    All,
}

pub fn run(action: StatsAction) -> CommandResult {
    let config = load_config();
    let session = open_session(&config)?;
    let period = match action {
        StatsAction::Today => StatsPeriod::Today,
        StatsAction::Week => StatsPeriod::Week,
        StatsAction::All => StatsPeriod::All,
    };

    let stats = session
        .activities()
        .stats(period, SystemClock.now(), &config.calendar());
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
