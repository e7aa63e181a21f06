//! Owns the timer engine and everything its transitions touch.
//!
//! The controller reads the clock, hands finished countdowns to the
//! [`SessionRecorder`], keeps the recent session history the auto-chain
//! rule counts from, and publishes every [`Event`] to subscribers.

use tokio::sync::broadcast;
use tracing::{debug, error};

use super::engine::{Outcome, TimerEngine, TimerSnapshot};
use super::settings::{SessionType, SettingsUpdate, TimerSettings};
use crate::clock::Clock;
use crate::error::{CoreError, StoreError, TransitionError};
use crate::events::Event;
use crate::model::Session;
use crate::recorder::{Recorded, SessionRecorder, TaskHoursUpdate};
use crate::storage::EntityStore;

/// Events buffered per subscriber before the slowest one starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Default number of recent sessions loaded into the history.
const DEFAULT_HISTORY_LIMIT: usize = 10;

pub struct TimerController<S, C> {
    engine: TimerEngine,
    recorder: SessionRecorder<S>,
    clock: C,
    /// Most recent first.
    history: Vec<Session>,
    history_limit: usize,
    events: broadcast::Sender<Event>,
}

impl<S: EntityStore, C: Clock> TimerController<S, C> {
    pub fn new(store: S, clock: C, settings: TimerSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            engine: TimerEngine::new(settings),
            recorder: SessionRecorder::new(store),
            clock,
            history: Vec::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            events,
        }
    }

    /// Number of recent sessions kept in the history, both when
    /// [`Self::load_history`] fetches it and as new sessions are recorded.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        self.recorder.store()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn history(&self) -> &[Session] {
        &self.history
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.engine.snapshot(self.clock.now())
    }

    /// Replace the in-memory history with the newest sessions from the store.
    ///
    /// # Errors
    /// Returns the store error; the previous history is kept.
    pub async fn load_history(&mut self) -> Result<(), StoreError> {
        let sessions: Vec<Session> = self
            .recorder
            .store()
            .list("-created_date", Some(self.history_limit))
            .await?;
        debug!(count = sessions.len(), "session history loaded");
        self.history = sessions;
        Ok(())
    }

    /// Completed pomodoros in the history.
    pub fn completed_pomodoros(&self) -> usize {
        self.history
            .iter()
            .filter(|s| s.is_completed_pomodoro())
            .count()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<(), TransitionError> {
        let outcome = self.engine.start(self.clock.now())?;
        self.publish_all(outcome.events);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TransitionError> {
        let outcome = self.engine.pause(self.clock.now())?;
        self.publish_all(outcome.events);
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), TransitionError> {
        let outcome = self.engine.reset(self.clock.now())?;
        self.publish_all(outcome.events);
        Ok(())
    }

    pub fn set_session_type(&mut self, session_type: SessionType) -> Result<(), TransitionError> {
        let outcome = self.engine.set_session_type(session_type, self.clock.now())?;
        self.publish_all(outcome.events);
        Ok(())
    }

    pub fn set_settings(&mut self, update: SettingsUpdate) {
        let outcome = self.engine.set_settings(update, self.clock.now());
        self.publish_all(outcome.events);
    }

    pub fn select_task(&mut self, task_id: Option<String>) {
        self.engine.select_task(task_id);
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.engine.set_notes(notes);
    }

    /// End the countdown early, recording it when at least a minute elapsed.
    ///
    /// # Errors
    /// Fails on an invalid transition (state untouched) or when the session
    /// could not be saved (the timer is already idle).
    pub async fn stop(&mut self) -> Result<Option<Session>, CoreError> {
        let outcome = self.engine.stop(self.clock.now())?;
        self.finish(outcome).await
    }

    /// Advance a running countdown by `elapsed_secs`.
    ///
    /// # Errors
    /// Fails only when a finished countdown could not be saved.
    pub async fn tick(&mut self, elapsed_secs: u64) -> Result<Option<Session>, CoreError> {
        let completed = self.completed_pomodoros();
        let outcome = self.engine.tick(elapsed_secs, completed, self.clock.now());
        self.finish(outcome).await
    }

    /// Publish an event that did not come from an engine transition.
    pub(crate) fn publish(&self, event: Event) {
        debug!(event = event.name(), "timer event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn publish_all(&self, events: Vec<Event>) {
        for event in events {
            self.publish(event);
        }
    }

    async fn finish(&mut self, outcome: Outcome) -> Result<Option<Session>, CoreError> {
        self.publish_all(outcome.events);
        let Some(request) = outcome.record else {
            return Ok(None);
        };

        let recorded = self
            .recorder
            .record_session(request.duration_minutes, request.completed, &request.context)
            .await;
        let now = self.clock.now();
        match recorded {
            Ok(Recorded::Skipped) => Ok(None),
            Ok(Recorded::Saved {
                session,
                task_update,
            }) => {
                self.history.insert(0, session.clone());
                self.history.truncate(self.history_limit);
                self.publish(Event::SessionRecorded {
                    session_id: session.id.clone(),
                    session_type: session.session_type,
                    duration_minutes: session.duration_minutes,
                    completed: session.completed,
                    at: now,
                });
                match task_update {
                    TaskHoursUpdate::NotRequested => {}
                    TaskHoursUpdate::Updated(task) => self.publish(Event::TaskHoursUpdated {
                        task_id: task.id,
                        actual_hours: task.actual_hours.unwrap_or(0.0),
                        at: now,
                    }),
                    TaskHoursUpdate::Failed(e) => self.publish(Event::PersistenceFailed {
                        message: format!("failed to update task hours: {e}"),
                        at: now,
                    }),
                }
                Ok(Some(session))
            }
            Err(e) => {
                error!(error = %e, "session was not saved");
                self.publish(Event::PersistenceFailed {
                    message: e.to_string(),
                    at: now,
                });
                Err(e.into())
            }
        }
    }
}
