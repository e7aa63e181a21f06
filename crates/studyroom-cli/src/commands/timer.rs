use clap::Subcommand;
use serde_json::json;
use studyroom_core::{
    run_timer_loop, Config, SessionType, SettingsUpdate, SystemClock, TimerCommand,
    TimerController, TimerSettings,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use super::{open_store, print_json, runtime, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the timer, reading commands from stdin and printing events as JSON lines
    ///
    /// Commands: start, pause, stop, reset, status, quit, type <session-type>,
    /// set <session-type> <minutes>, task <id|none>, notes <text>.
    Run {
        /// Session type to begin with
        #[arg(long = "type", value_name = "SESSION_TYPE")]
        session_type: Option<SessionType>,
        /// Task the sessions count toward
        #[arg(long)]
        task: Option<String>,
        /// Notes for the first recorded session
        #[arg(long)]
        notes: Option<String>,
        /// Start the countdown immediately
        #[arg(long)]
        autostart: bool,
    },
    /// Print default durations and their allowed ranges
    Durations,
}

pub fn run(action: TimerAction, config: &Config) -> CliResult {
    match action {
        TimerAction::Run {
            session_type,
            task,
            notes,
            autostart,
        } => {
            let rt = runtime()?;
            let result = rt.block_on(run_interactive(config, session_type, task, notes, autostart));
            // The stdin reader may still be parked on a blocking read.
            rt.shutdown_background();
            result?;
        }
        TimerAction::Durations => {
            let settings = TimerSettings::default();
            let durations: Vec<_> = SessionType::ALL
                .iter()
                .map(|&t| {
                    let range = TimerSettings::range(t);
                    json!({
                        "session_type": t,
                        "label": t.label(),
                        "minutes": settings.minutes(t),
                        "min": range.min,
                        "max": range.max,
                    })
                })
                .collect();
            print_json(&durations)?;
        }
    }
    Ok(())
}

async fn run_interactive(
    config: &Config,
    session_type: Option<SessionType>,
    task: Option<String>,
    notes: Option<String>,
    autostart: bool,
) -> CliResult {
    let store = open_store(config)?;
    let mut controller = TimerController::new(store, SystemClock, TimerSettings::default())
        .with_history_limit(config.history.limit);
    if let Err(e) = controller.load_history().await {
        warn!(error = %e, "could not load session history; long breaks start counting from zero");
    }

    let printer = tokio::spawn(print_events(controller.subscribe()));

    controller.select_task(task);
    if let Some(notes) = notes {
        controller.set_notes(notes);
    }
    if let Some(session_type) = session_type {
        controller.set_session_type(session_type)?;
    }
    if autostart {
        controller.start()?;
    }

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(read_commands(tx));

    run_timer_loop(&mut controller, rx).await;

    // Closing the event channel lets the printer drain and finish.
    drop(controller);
    let _ = printer.await;
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<studyroom_core::Event>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "failed to encode event"),
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "event printer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn read_commands(tx: mpsc::Sender<TimerCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match parse_command(&line) {
            Ok(Some(command)) => {
                if tx.send(command).await.is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => eprintln!("{message}"),
        }
    }
}

/// Parse one stdin line. Blank lines yield `None`.
fn parse_command(line: &str) -> Result<Option<TimerCommand>, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "start" | "resume" => TimerCommand::Start,
        "pause" => TimerCommand::Pause,
        "stop" => TimerCommand::Stop,
        "reset" => TimerCommand::Reset,
        "status" => TimerCommand::Snapshot,
        "quit" | "exit" => TimerCommand::Quit,
        "type" => TimerCommand::SetSessionType(parse_session_type(rest)?),
        "set" => {
            let (kind, minutes) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: set <session-type> <minutes>")?;
            let minutes: i64 = minutes
                .trim()
                .parse()
                .map_err(|_| format!("invalid minutes: {}", minutes.trim()))?;
            let mut update = SettingsUpdate::default();
            update.set(parse_session_type(kind)?, minutes);
            TimerCommand::SetSettings(update)
        }
        "task" => match rest {
            "" | "none" => TimerCommand::SelectTask(None),
            id => TimerCommand::SelectTask(Some(id.to_string())),
        },
        "notes" => TimerCommand::SetNotes(rest.to_string()),
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(command))
}

fn parse_session_type(raw: &str) -> Result<SessionType, String> {
    raw.parse::<SessionType>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_commands() {
        assert_eq!(parse_command("start").unwrap(), Some(TimerCommand::Start));
        assert_eq!(parse_command("  PAUSE ").unwrap(), Some(TimerCommand::Pause));
        assert_eq!(parse_command("status").unwrap(), Some(TimerCommand::Snapshot));
        assert_eq!(parse_command("").unwrap(), None);
    }

    #[test]
    fn parses_arguments() {
        assert_eq!(
            parse_command("type deep-work").unwrap(),
            Some(TimerCommand::SetSessionType(SessionType::DeepWork))
        );
        assert_eq!(
            parse_command("task none").unwrap(),
            Some(TimerCommand::SelectTask(None))
        );
        assert_eq!(
            parse_command("notes chapter 4 and 5").unwrap(),
            Some(TimerCommand::SetNotes("chapter 4 and 5".into()))
        );

        let Some(TimerCommand::SetSettings(update)) =
            parse_command("set short_break 500").unwrap()
        else {
            panic!("expected settings update");
        };
        assert_eq!(update.short_break, Some(500));
        assert_eq!(update.pomodoro, None);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("jump").is_err());
        assert!(parse_command("type nap").is_err());
        assert!(parse_command("set pomodoro").is_err());
        assert!(parse_command("set pomodoro soon").is_err());
    }
}
