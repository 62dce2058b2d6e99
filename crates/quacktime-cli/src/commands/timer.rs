use std::io::Write;
use std::time::Duration;

use clap::Subcommand;
use quacktime_core::{
    Config, DisplayPublisher, DisplayState, Event, FocusSession, NullDisplay, SessionLabel,
    TimerState,
};

use tracing::info;

use super::{load_config, open_session, CommandResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a focus session
    Start {
        /// Activity name shown while the session runs
        #[arg(long)]
        name: Option<String>,
        /// Activity emoji
        #[arg(long)]
        emoji: Option<String>,
    },
    /// Toggle between focus and break
    Break,
    /// Stop the session and save it as an activity
    Stop {
        /// Activity name (defaults to the configured session name)
        #[arg(long)]
        name: Option<String>,
        /// Activity emoji (defaults to the configured emoji)
        #[arg(long)]
        emoji: Option<String>,
        /// Throw the session away instead of saving it
        #[arg(long)]
        discard: bool,
    },
    /// Discard the running session
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Print current timer state as JSON
    Status,
    /// Tick the running session every second until Ctrl-C
    Watch,
}

/// Flags win over `fallback`, part by part.
fn label(fallback: &SessionLabel, name: Option<String>, emoji: Option<String>) -> SessionLabel {
    SessionLabel::new(
        name.unwrap_or_else(|| fallback.name.clone()),
        emoji.unwrap_or_else(|| fallback.emoji.clone()),
    )
}

fn configured_label(config: &Config) -> SessionLabel {
    SessionLabel::new(
        config.session.default_name.clone(),
        config.session.default_emoji.clone(),
    )
}

fn print_event(event: &Event) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

pub fn run(action: TimerAction) -> CommandResult {
    let config = load_config();
    let mut session = open_session(&config)?;

    if let TimerAction::Status = action {
        session.enter_foreground();
        return print_event(&session.status());
    }

    session.enter_foreground();
    let result = apply(&mut session, &config, action);
    session.enter_background();
    result
}

fn apply(session: &mut FocusSession, config: &Config, action: TimerAction) -> CommandResult {
    match action {
        TimerAction::Start { name, emoji } => match session.start(label(&configured_label(config), name, emoji)) {
            Some(event) => print_event(&event)?,
            None => return Err(rejected(session.state(), "start")),
        },
        TimerAction::Break => match session.toggle_break() {
            Some(event) => print_event(&event)?,
            None => return Err(rejected(session.state(), "toggle a break")),
        },
        TimerAction::Stop {
            name,
            emoji,
            discard,
        } => {
            // The label given at start, unless overridden here.
            let label = label(session.label(), name, emoji);
            let pending = session
                .stop()
                .ok_or_else(|| rejected(session.state(), "stop"))?;
            print_event(&pending.to_event())?;
            if discard {
                print_event(&session.discard(pending))?;
            } else {
                let outcome = session.confirm(pending, label)?;
                for event in &outcome.events {
                    print_event(event)?;
                }
                if let Some(celebration) = outcome.celebration {
                    eprintln!("{}", celebration.header);
                    eprintln!("{}", celebration.sub_header);
                }
            }
        }
        TimerAction::Reset { yes } => {
            if !yes {
                return Err("reset discards the running session; pass --yes to confirm".into());
            }
            match session.reset() {
                Some(event) => print_event(&event)?,
                None => return Err(rejected(session.state(), "reset")),
            }
        }
        TimerAction::Watch => {
            if !session.state().is_active() {
                return Err("no session is running".into());
            }
            watch(session, config)?;
        }
        TimerAction::Status => print_event(&session.status())?,
    }
    Ok(())
}

fn rejected(state: TimerState, what: &str) -> Box<dyn std::error::Error> {
    format!("cannot {what} while {}", state.as_str()).into()
}

/// Redraws one status line on stderr.
struct TerminalDisplay;

impl DisplayPublisher for TerminalDisplay {
    fn publish(&mut self, state: &DisplayState) {
        let marker = match state.state {
            TimerState::OnBreak => " (break)",
            _ => "",
        };
        let mut err = std::io::stderr();
        write!(
            err,
            "\r{} {}  {}{marker}   ",
            state.emoji,
            state.activity_name,
            state.formatted_time()
        )
        .and_then(|()| err.flush())
        .ok();
    }

    fn end(&mut self) {
        eprintln!();
    }
}

fn watch(session: &mut FocusSession, config: &Config) -> CommandResult {
    // With log_ticks the session already publishes to the log.
    let mut display: Box<dyn DisplayPublisher> = if config.display.log_ticks {
        Box::new(NullDisplay)
    } else {
        Box::new(TerminalDisplay)
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // The first tick completes immediately.
        interval.tick().await;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        display.publish(&session.display_state());
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // Another command stopped, reset or toggled the session.
                    if session.store_changed() {
                        info!("snapshot changed outside watch; reloading");
                        session.reload();
                    }
                    if !session.tick() {
                        break;
                    }
                    display.publish(&session.display_state());
                }
                _ = &mut ctrl_c => break,
            }
        }
        display.end();
    });
    Ok(())
}
