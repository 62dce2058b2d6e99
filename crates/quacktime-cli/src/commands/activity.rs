use clap::Subcommand;
use quacktime_core::ActivityRecord;
use uuid::Uuid;

use super::{load_config, open_session, CommandResult};

#[derive(Subcommand)]
pub enum ActivityAction {
    /// List saved activities, newest day first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one activity as JSON
    Show {
        /// Activity ID
        id: String,
    },
    /// Delete an activity
    Delete {
        /// Activity ID
        id: String,
    },
}

fn parse_id(id: &str) -> Result<Uuid, Box<dyn std::error::Error>> {
    Uuid::parse_str(id).map_err(|e| format!("invalid activity id {id}: {e}").into())
}

fn summary_line(record: &ActivityRecord) -> String {
    let mut line = format!(
        "  {} {}  {}  {} focus",
        record.emoji,
        record.name,
        record.start_time.format("%H:%M"),
        record.formatted_duration(),
    );
    if record.break_duration_secs > 0 {
        line.push_str(&format!(", {} break", record.formatted_break_duration()));
    }
    line.push_str(&format!("  [{}]", record.id));
    line
}

pub fn run(action: ActivityAction) -> CommandResult {
    let config = load_config();
    let mut session = open_session(&config)?;

    match action {
        ActivityAction::List { json } => {
            let log = session.activities();
            if json {
                println!("{}", serde_json::to_string_pretty(log.list())?);
            } else if log.is_empty() {
                println!("No activities yet.");
            } else {
                for (day, records) in log.group_by_day(&config.calendar()) {
                    println!("{}", day.format("%A, %B %-d %Y"));
                    for record in records {
                        println!("{}", summary_line(record));
                    }
                }
            }
        }
        ActivityAction::Show { id } => {
            let id = parse_id(&id)?;
            let record = session
                .activities()
                .get(id)
                .ok_or_else(|| format!("activity not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        ActivityAction::Delete { id } => {
            let id = parse_id(&id)?;
            if !session.activities_mut().delete(id)? {
                return Err(format!("activity not found: {id}").into());
            }
            println!("Activity deleted: {id}");
        }
    }
    Ok(())
}
