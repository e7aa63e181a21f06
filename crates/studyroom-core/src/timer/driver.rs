//! Event loop that drives a [`TimerController`] in real time.
//!
//! A one-second interval exists only while the timer is running. It is
//! created when the timer enters Running and dropped as soon as it leaves,
//! so a paused or idle timer costs nothing and ticks never overlap.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval};
use tracing::{debug, info, warn};

use super::controller::TimerController;
use super::settings::{SessionType, SettingsUpdate};
use crate::clock::Clock;
use crate::error::CoreError;
use crate::events::Event;
use crate::storage::EntityStore;

const TICK: Duration = Duration::from_secs(1);

/// Commands accepted by [`run_timer_loop`].
#[derive(Debug, Clone, PartialEq)]
pub enum TimerCommand {
    Start,
    Pause,
    Stop,
    Reset,
    SetSessionType(SessionType),
    SetSettings(SettingsUpdate),
    SelectTask(Option<String>),
    SetNotes(String),
    /// Publish a `StateSnapshot` event.
    Snapshot,
    /// Leave the loop immediately; a running countdown is not recorded.
    Quit,
}

/// Run the timer until `Quit`, or until the command channel closes and the
/// timer is no longer running.
///
/// Rejected commands and failed writes are published as events; nothing
/// here ends the loop early.
pub async fn run_timer_loop<S: EntityStore, C: Clock>(
    controller: &mut TimerController<S, C>,
    mut commands: mpsc::Receiver<TimerCommand>,
) {
    let mut ticker: Option<Interval> = None;
    let mut commands_open = true;

    loop {
        match (controller.engine().is_running(), ticker.is_some()) {
            (true, false) => ticker = Some(interval_at(Instant::now() + TICK, TICK)),
            (false, true) => ticker = None,
            _ => {}
        }
        if !commands_open && ticker.is_none() {
            debug!("command channel closed, timer loop exiting");
            break;
        }

        tokio::select! {
            command = commands.recv(), if commands_open => match command {
                Some(TimerCommand::Quit) => {
                    info!("timer loop quit");
                    break;
                }
                Some(command) => apply(controller, command).await,
                None => commands_open = false,
            },
            _ = next_tick(&mut ticker), if ticker.is_some() => {
                if let Err(e) = controller.tick(1).await {
                    warn!(error = %e, "tick failed");
                }
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn apply<S: EntityStore, C: Clock>(
    controller: &mut TimerController<S, C>,
    command: TimerCommand,
) {
    debug!(?command, "timer command");
    let result: Result<(), CoreError> = match command {
        TimerCommand::Start => controller.start().map_err(Into::into),
        TimerCommand::Pause => controller.pause().map_err(Into::into),
        TimerCommand::Stop => controller.stop().await.map(|_| ()),
        TimerCommand::Reset => controller.reset().map_err(Into::into),
        TimerCommand::SetSessionType(t) => controller.set_session_type(t).map_err(Into::into),
        TimerCommand::SetSettings(update) => {
            controller.set_settings(update);
            Ok(())
        }
        TimerCommand::SelectTask(task_id) => {
            controller.select_task(task_id);
            Ok(())
        }
        TimerCommand::SetNotes(notes) => {
            controller.set_notes(notes);
            Ok(())
        }
        TimerCommand::Snapshot => {
            controller.publish(Event::StateSnapshot(controller.snapshot()));
            Ok(())
        }
        TimerCommand::Quit => Ok(()),
    };

    match result {
        Ok(()) => {}
        Err(CoreError::Transition(e)) => {
            debug!(error = %e, "command rejected");
            controller.publish(Event::CommandRejected {
                message: e.to_string(),
                at: controller.clock().now(),
            });
        }
        // Already published as PersistenceFailed.
        Err(e) => warn!(error = %e, "timer command failed"),
    }
}
