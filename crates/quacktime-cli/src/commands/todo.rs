use std::rc::Rc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Subcommand;
use quacktime_core::storage::Database;
use quacktime_core::{CalendarContext, Clock, SystemClock, TodoGroup, TodoItem, TodoList};
use uuid::Uuid;

use super::{load_config, CommandResult};

#[derive(Subcommand)]
pub enum TodoAction {
    /// List to-do items, grouped
    List {
        /// Only this group (name or ID)
        #[arg(long)]
        group: Option<String>,
        /// Hide completed items
        #[arg(long)]
        pending: bool,
        /// Only open items due today
        #[arg(long)]
        today: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an item
    Add {
        /// Item title
        title: String,
        /// Group name or ID (defaults to the first group)
        #[arg(long)]
        group: Option<String>,
        /// Due date: YYYY-MM-DD, "YYYY-MM-DD HH:MM" or RFC 3339
        #[arg(long)]
        due: Option<String>,
    },
    /// Toggle an item's completion
    Done {
        /// Item ID
        id: String,
    },
    /// Change an item
    Edit {
        /// Item ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// New due date
        #[arg(long, conflicts_with = "no_due")]
        due: Option<String>,
        /// Clear the due date
        #[arg(long)]
        no_due: bool,
        /// Move to another group
        #[arg(long)]
        group: Option<String>,
    },
    /// Delete an item
    Delete {
        /// Item ID
        id: String,
    },
    /// Manage groups
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },
}

#[derive(Subcommand)]
pub enum GroupAction {
    /// List groups
    List,
    /// Add a group
    Add {
        name: String,
        #[arg(long)]
        icon: Option<String>,
        /// One of orange, blue, green, purple, pink, red, yellow, teal
        #[arg(long)]
        color: Option<String>,
    },
    /// Rename a group
    Rename {
        /// Group name or ID
        group: String,
        name: String,
    },
    /// Delete a group and its items
    Delete {
        /// Group name or ID
        group: String,
    },
}

fn parse_id(id: &str) -> Result<Uuid, Box<dyn std::error::Error>> {
    Uuid::parse_str(id).map_err(|e| format!("invalid todo id {id}: {e}").into())
}

/// Parse a due date in the configured calendar.
fn parse_due(raw: &str, calendar: &CalendarContext) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(calendar.start_of_day(day));
    }
    if let Some((day, time)) = raw.split_once(' ') {
        if let (Ok(day), Ok(time)) = (
            NaiveDate::parse_from_str(day, "%Y-%m-%d"),
            NaiveTime::parse_from_str(time, "%H:%M"),
        ) {
            return Ok(calendar.start_of_day(day) + (time - NaiveTime::MIN));
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| format!("invalid due date {raw}: expected YYYY-MM-DD, \"YYYY-MM-DD HH:MM\" or RFC 3339"))
}

fn group_id(list: &TodoList, key: &str) -> Result<Uuid, String> {
    list.find_group(key)
        .map(|g| g.id)
        .ok_or_else(|| format!("todo group not found: {key}"))
}

fn item_line(item: &TodoItem, calendar: &CalendarContext) -> String {
    let mark = if item.is_completed { "x" } else { " " };
    let mut line = format!("  [{mark}] {}", item.title);
    if let Some(due) = item.due_date {
        let local = calendar.day_of(due);
        line.push_str(&format!("  (due {})", local.format("%Y-%m-%d")));
    }
    line.push_str(&format!("  [{}]", item.id));
    line
}

pub fn run(action: TodoAction) -> CommandResult {
    let config = load_config();
    let calendar = config.calendar();
    let mut list = TodoList::load(Rc::new(Database::open()?));

    match action {
        TodoAction::List {
            group,
            pending,
            today,
            json,
        } => {
            let group = group.map(|g| group_id(&list, &g)).transpose()?;
            let now = SystemClock.now();
            let items: Vec<&TodoItem> = list
                .items()
                .iter()
                .filter(|i| group.map_or(true, |g| i.group_id == g))
                .filter(|i| !pending || !i.is_completed)
                .filter(|i| !today || i.is_due_today(now, &calendar))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("No to-do items.");
            } else {
                for g in list.groups() {
                    let in_group: Vec<_> = items.iter().filter(|i| i.group_id == g.id).collect();
                    if in_group.is_empty() {
                        continue;
                    }
                    println!("{} ({} open)", g.name, list.pending_in(g.id).count());
                    for item in in_group {
                        println!("{}", item_line(item, &calendar));
                    }
                }
            }
        }
        TodoAction::Add { title, group, due } => {
            let group = match group {
                Some(key) => group_id(&list, &key)?,
                None => list
                    .default_group()
                    .map(|g| g.id)
                    .ok_or("no todo group to add to")?,
            };
            let due = due.map(|d| parse_due(&d, &calendar)).transpose()?;
            let item = TodoItem::new(title, group, due, SystemClock.now());
            let id = item.id;
            list.add_item(item)?;
            println!("Added: {id}");
        }
        TodoAction::Done { id } => {
            let id = parse_id(&id)?;
            match list.toggle_complete(id)? {
                Some(true) => println!("Completed: {id}"),
                Some(false) => println!("Reopened: {id}"),
                None => return Err(format!("todo not found: {id}").into()),
            }
        }
        TodoAction::Edit {
            id,
            title,
            due,
            no_due,
            group,
        } => {
            let id = parse_id(&id)?;
            let mut item = list
                .item(id)
                .cloned()
                .ok_or_else(|| format!("todo not found: {id}"))?;
            if let Some(title) = title {
                item.title = title;
            }
            if no_due {
                item.due_date = None;
            } else if let Some(due) = due {
                item.due_date = Some(parse_due(&due, &calendar)?);
            }
            if let Some(key) = group {
                item.group_id = group_id(&list, &key)?;
            }
            list.update_item(item)?;
            println!("Updated: {id}");
        }
        TodoAction::Delete { id } => {
            let id = parse_id(&id)?;
            if !list.delete_item(id)? {
                return Err(format!("todo not found: {id}").into());
            }
            println!("Deleted: {id}");
        }
        TodoAction::Group { action } => run_group(&mut list, action)?,
    }
    Ok(())
}

fn run_group(list: &mut TodoList, action: GroupAction) -> CommandResult {
    match action {
        GroupAction::List => {
            for g in list.groups() {
                println!(
                    "{}  {} open, {} done  [{}]",
                    g.name,
                    list.pending_in(g.id).count(),
                    list.completed_in(g.id).count(),
                    g.id
                );
            }
        }
        GroupAction::Add { name, icon, color } => {
            let mut group = TodoGroup::new(name);
            if let Some(icon) = icon {
                group.icon = icon;
            }
            if let Some(color) = color {
                group.color_name = color;
            }
            let group = list.add_group(group)?;
            println!("Group added: {} [{}]", group.name, group.id);
        }
        GroupAction::Rename { group, name } => {
            let id = group_id(list, &group)?;
            let mut renamed = list
                .group(id)
                .cloned()
                .ok_or_else(|| format!("todo group not found: {group}"))?;
            renamed.name = name;
            list.update_group(renamed)?;
            println!("Group renamed: {id}");
        }
        GroupAction::Delete { group } => {
            let id = group_id(list, &group)?;
            list.delete_group(id)?;
            println!("Group deleted: {id}");
        }
    }
    Ok(())
}
