//! Study timer state machine.
//!
//! The engine is a plain value: it never reads a clock, sleeps or touches
//! storage. Every command takes `now` explicitly and returns an [`Outcome`]
//! listing the events it produced and, when a countdown finished, the
//! session that should be recorded. The caller owns scheduling (one `tick`
//! per elapsed second while running) and persistence.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Running --pause--> Paused --start--> Running
//! Running|Paused --stop--> Idle          (records if >= 1 minute elapsed)
//! Idle|Paused --reset--> Idle            (never records)
//! Running --tick to 0--> Idle            (records, then auto-chains)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::settings::{SessionType, SettingsUpdate, TimerSettings};
use crate::error::TransitionError;
use crate::events::Event;
use crate::recorder::SessionContext;

/// Long break after every this many completed pomodoros.
pub const POMODOROS_PER_LONG_BREAK: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
}

impl std::fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
        })
    }
}

/// Start time and context of the countdown in progress.
///
/// Exists only while Running or Paused; it becomes a Session when the
/// countdown ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMarker {
    pub started_at: DateTime<Utc>,
    pub session_type: SessionType,
    pub task_id: Option<String>,
}

/// A finished countdown that should become a Session record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRequest {
    pub duration_minutes: u32,
    pub completed: bool,
    pub context: SessionContext,
}

/// What a command did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub events: Vec<Event>,
    pub record: Option<RecordRequest>,
}

impl Outcome {
    fn event(event: Event) -> Self {
        Self {
            events: vec![event],
            record: None,
        }
    }
}

/// Observable timer state for UIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub session_type: SessionType,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub progress_pct: f64,
    pub task_id: Option<String>,
    pub at: DateTime<Utc>,
}

/// Core timer engine.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    settings: TimerSettings,
    session_type: SessionType,
    status: TimerStatus,
    remaining_secs: u64,
    marker: Option<SessionMarker>,
    selected_task: Option<String>,
    notes: String,
}

impl TimerEngine {
    /// Create an idle engine on a full pomodoro.
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            settings,
            session_type: SessionType::Pomodoro,
            status: TimerStatus::Idle,
            remaining_secs: settings.duration_secs(SessionType::Pomodoro),
            marker: None,
            selected_task: None,
            notes: String::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn marker(&self) -> Option<&SessionMarker> {
        self.marker.as_ref()
    }

    pub fn selected_task(&self) -> Option<&str> {
        self.selected_task.as_deref()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn session_duration(&self, session_type: SessionType) -> u64 {
        self.settings.duration_secs(session_type)
    }

    pub fn total_secs(&self) -> u64 {
        self.session_duration(self.session_type)
    }

    /// Remaining seconds as a UI should show them.
    ///
    /// A zero countdown outside Running is shown as the full duration.
    pub fn remaining_secs(&self) -> u64 {
        if self.status != TimerStatus::Running && self.remaining_secs == 0 {
            self.total_secs()
        } else {
            self.remaining_secs
        }
    }

    /// 0.0 .. 100.0 progress through the current countdown.
    pub fn progress_pct(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        let done = total.saturating_sub(self.remaining_secs());
        (done as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// `MM:SS` rendering of [`Self::remaining_secs`].
    pub fn format_remaining(&self) -> String {
        let secs = self.remaining_secs();
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    pub fn snapshot(&self, at: DateTime<Utc>) -> TimerSnapshot {
        let task_id = match &self.marker {
            Some(marker) => marker.task_id.clone(),
            None => self.selected_task.clone(),
        };
        TimerSnapshot {
            status: self.status,
            session_type: self.session_type,
            remaining_secs: self.remaining_secs(),
            total_secs: self.total_secs(),
            progress_pct: self.progress_pct(),
            task_id,
            at,
        }
    }

    /// Break that follows a pomodoro, given the number of completed
    /// pomodoros including the one that just finished.
    pub fn break_after(completed_pomodoros: usize) -> SessionType {
        if completed_pomodoros % POMODOROS_PER_LONG_BREAK == 0 {
            SessionType::LongBreak
        } else {
            SessionType::ShortBreak
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a countdown, or continue a paused one.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<Outcome, TransitionError> {
        if self.status == TimerStatus::Running {
            return Err(self.reject("start"));
        }
        if self.remaining_secs == 0 {
            self.remaining_secs = self.total_secs();
        }
        let resumed = self.marker.is_some();
        if !resumed {
            self.marker = Some(SessionMarker {
                started_at: now,
                session_type: self.session_type,
                task_id: self.selected_task.clone(),
            });
        }
        self.status = TimerStatus::Running;
        Ok(Outcome::event(Event::TimerStarted {
            session_type: self.session_type,
            remaining_secs: self.remaining_secs,
            task_id: self.marker.as_ref().and_then(|m| m.task_id.clone()),
            resumed,
            at: now,
        }))
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<Outcome, TransitionError> {
        if self.status != TimerStatus::Running {
            return Err(self.reject("pause"));
        }
        self.status = TimerStatus::Paused;
        Ok(Outcome::event(Event::TimerPaused {
            remaining_secs: self.remaining_secs,
            at: now,
        }))
    }

    /// End the countdown early.
    ///
    /// Elapsed wall-clock time since the marker was set, rounded to whole
    /// minutes, is recorded as an incomplete session when at least one
    /// minute.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<Outcome, TransitionError> {
        if self.status == TimerStatus::Idle {
            return Err(self.reject("stop"));
        }
        let mut elapsed_minutes = 0;
        let mut record = None;
        if let Some(marker) = self.marker.take() {
            elapsed_minutes = elapsed_minutes_between(marker.started_at, now);
            if elapsed_minutes > 0 {
                record = Some(self.record_request(marker, elapsed_minutes, false));
            }
        }
        let session_type = self.session_type;
        self.go_idle(session_type);
        Ok(Outcome {
            events: vec![Event::TimerStopped {
                session_type,
                elapsed_minutes,
                at: now,
            }],
            record,
        })
    }

    /// Discard the countdown without recording it.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Result<Outcome, TransitionError> {
        if self.status == TimerStatus::Running {
            return Err(self.reject("reset"));
        }
        let already_reset = self.status == TimerStatus::Idle
            && self.marker.is_none()
            && self.remaining_secs == self.total_secs();
        if already_reset {
            return Ok(Outcome::default());
        }
        self.go_idle(self.session_type);
        Ok(Outcome::event(Event::TimerReset {
            session_type: self.session_type,
            remaining_secs: self.remaining_secs,
            at: now,
        }))
    }

    /// Switch session type. Any paused countdown is discarded unrecorded.
    pub fn set_session_type(
        &mut self,
        session_type: SessionType,
        now: DateTime<Utc>,
    ) -> Result<Outcome, TransitionError> {
        if self.status == TimerStatus::Running {
            return Err(self.reject("change session type"));
        }
        let from = self.session_type;
        self.go_idle(session_type);
        Ok(Outcome::event(Event::SessionTypeChanged {
            from,
            to: session_type,
            remaining_secs: self.remaining_secs,
            at: now,
        }))
    }

    /// Apply new durations, clamped to their ranges.
    ///
    /// An idle timer shows the new full duration right away; a countdown in
    /// progress keeps its remaining time.
    pub fn set_settings(&mut self, update: SettingsUpdate, now: DateTime<Utc>) -> Outcome {
        self.settings.apply(update);
        if self.status == TimerStatus::Idle {
            self.remaining_secs = self.total_secs();
        }
        Outcome::event(Event::SettingsChanged {
            settings: self.settings,
            at: now,
        })
    }

    /// Task attached to the next countdown that starts.
    pub fn select_task(&mut self, task_id: Option<String>) {
        self.selected_task = task_id.filter(|id| !id.trim().is_empty());
    }

    /// Notes attached to the next recorded session.
    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Advance the countdown by `elapsed_secs`.
    ///
    /// `completed_pomodoros` is the number of completed pomodoros already
    /// in the session history, not counting the current countdown. Ignored
    /// unless Running.
    pub fn tick(
        &mut self,
        elapsed_secs: u64,
        completed_pomodoros: usize,
        now: DateTime<Utc>,
    ) -> Outcome {
        if self.status != TimerStatus::Running || elapsed_secs == 0 {
            return Outcome::default();
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(elapsed_secs);
        if self.remaining_secs > 0 {
            return Outcome::event(Event::TimerTicked {
                remaining_secs: self.remaining_secs,
                progress_pct: self.progress_pct(),
                at: now,
            });
        }
        self.complete(completed_pomodoros, now)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete(&mut self, completed_pomodoros: usize, now: DateTime<Utc>) -> Outcome {
        let finished = self.session_type;
        let duration_minutes = self.settings.minutes(finished);
        let record = self
            .marker
            .take()
            .map(|marker| self.record_request(marker, duration_minutes, true));

        let mut events = vec![Event::TimerCompleted {
            session_type: finished,
            duration_minutes,
            at: now,
        }];

        if finished == SessionType::Pomodoro {
            let next = Self::break_after(completed_pomodoros + 1);
            self.go_idle(next);
            events.push(Event::AutoChained {
                from: finished,
                to: next,
                remaining_secs: self.remaining_secs,
                at: now,
            });
        } else {
            self.go_idle(finished);
        }

        Outcome { events, record }
    }

    fn go_idle(&mut self, session_type: SessionType) {
        self.session_type = session_type;
        self.status = TimerStatus::Idle;
        self.marker = None;
        self.remaining_secs = self.total_secs();
    }

    fn record_request(
        &mut self,
        marker: SessionMarker,
        duration_minutes: u32,
        completed: bool,
    ) -> RecordRequest {
        RecordRequest {
            duration_minutes,
            completed,
            context: SessionContext {
                task_id: marker.task_id,
                session_type: marker.session_type,
                notes: std::mem::take(&mut self.notes),
            },
        }
    }

    fn reject(&self, command: &'static str) -> TransitionError {
        TransitionError::NotAllowed {
            command,
            status: self.status,
        }
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(TimerSettings::default())
    }
}

/// Whole minutes between two instants, rounded half up. Never negative.
pub fn elapsed_minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let elapsed_ms = (end - start).num_milliseconds().max(0);
    (elapsed_ms as f64 / 60_000.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    fn run_to_zero(engine: &mut TimerEngine, completed_pomodoros: usize) -> Outcome {
        let mut last = Outcome::default();
        let total = engine.total_secs();
        for i in 0..total {
            last = engine.tick(1, completed_pomodoros, t0() + Duration::seconds(i as i64 + 1));
        }
        last
    }

    #[test]
    fn new_engine_is_idle_on_full_pomodoro() {
        let engine = TimerEngine::default();
        assert_eq!(engine.status(), TimerStatus::Idle);
        assert_eq!(engine.session_type(), SessionType::Pomodoro);
        assert_eq!(engine.remaining_secs(), 1500);
        assert_eq!(engine.format_remaining(), "25:00");
        assert_eq!(engine.progress_pct(), 0.0);
    }

    #[test]
    fn zero_remaining_outside_running_shows_and_restarts_full_duration() {
        let mut engine = TimerEngine::default();
        engine.remaining_secs = 0;
        assert_eq!(engine.remaining_secs(), engine.total_secs());
        assert_eq!(engine.progress_pct(), 0.0);
        assert_eq!(engine.format_remaining(), "25:00");

        engine.start(t0()).unwrap();
        assert_eq!(engine.status(), TimerStatus::Running);
        assert_eq!(engine.remaining_secs, engine.total_secs());
        assert_eq!(engine.remaining_secs(), 1500);
    }

    #[test]
    fn set_session_type_loads_full_duration() {
        let mut engine = TimerEngine::default();
        for &t in SessionType::ALL {
            engine.set_session_type(t, t0()).unwrap();
            assert_eq!(engine.remaining_secs(), engine.session_duration(t));
            assert_eq!(
                engine.session_duration(t),
                u64::from(engine.settings().minutes(t)) * 60
            );
        }
    }

    #[test]
    fn start_pause_start_keeps_marker_and_remaining() {
        let mut engine = TimerEngine::default();
        engine.start(t0()).unwrap();
        engine.tick(10, 0, t0());
        engine.pause(t0()).unwrap();
        assert_eq!(engine.status(), TimerStatus::Paused);
        assert_eq!(engine.remaining_secs(), 1490);

        let outcome = engine.start(t0() + Duration::minutes(5)).unwrap();
        assert_eq!(engine.remaining_secs(), 1490);
        assert_eq!(engine.marker().unwrap().started_at, t0());
        assert!(matches!(
            outcome.events[0],
            Event::TimerStarted { resumed: true, .. }
        ));
    }

    #[test]
    fn running_rejects_reset_type_change_and_second_start() {
        let mut engine = TimerEngine::default();
        engine.start(t0()).unwrap();
        assert!(engine.reset(t0()).is_err());
        assert!(engine.start(t0()).is_err());
        let err = engine
            .set_session_type(SessionType::DeepWork, t0())
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::NotAllowed {
                command: "change session type",
                status: TimerStatus::Running,
            }
        );
        assert_eq!(engine.session_type(), SessionType::Pomodoro);
        assert!(engine.is_running());
    }

    #[test]
    fn idle_rejects_pause_and_stop() {
        let mut engine = TimerEngine::default();
        assert!(engine.pause(t0()).is_err());
        assert!(engine.stop(t0()).is_err());
    }

    #[test]
    fn completing_a_pomodoro_records_and_chains_to_short_break() {
        let mut engine = TimerEngine::default();
        engine.select_task(Some("task-1".into()));
        engine.set_notes("chapter 3");
        engine.start(t0()).unwrap();

        let outcome = run_to_zero(&mut engine, 0);
        let record = outcome.record.expect("completion should record");
        assert_eq!(record.duration_minutes, 25);
        assert!(record.completed);
        assert_eq!(record.context.task_id.as_deref(), Some("task-1"));
        assert_eq!(record.context.notes, "chapter 3");
        assert_eq!(engine.notes(), "");

        assert_eq!(engine.status(), TimerStatus::Idle);
        assert_eq!(engine.session_type(), SessionType::ShortBreak);
        assert_eq!(engine.remaining_secs(), 5 * 60);
        assert!(engine.marker().is_none());
    }

    #[test]
    fn fourth_pomodoro_chains_to_long_break() {
        for (prior, expected) in [
            (0, SessionType::ShortBreak),
            (1, SessionType::ShortBreak),
            (2, SessionType::ShortBreak),
            (3, SessionType::LongBreak),
            (7, SessionType::LongBreak),
        ] {
            let mut engine = TimerEngine::default();
            engine.start(t0()).unwrap();
            run_to_zero(&mut engine, prior);
            assert_eq!(engine.session_type(), expected, "prior = {prior}");
        }
    }

    #[test]
    fn completed_break_and_deep_work_stay_on_type() {
        for t in [
            SessionType::ShortBreak,
            SessionType::LongBreak,
            SessionType::DeepWork,
        ] {
            let mut engine = TimerEngine::default();
            engine.set_session_type(t, t0()).unwrap();
            engine.start(t0()).unwrap();
            let outcome = run_to_zero(&mut engine, 3);
            assert!(outcome.record.is_some());
            assert_eq!(engine.session_type(), t);
            assert_eq!(engine.status(), TimerStatus::Idle);
            assert_eq!(engine.remaining_secs(), engine.session_duration(t));
            assert!(!outcome
                .events
                .iter()
                .any(|e| matches!(e, Event::AutoChained { .. })));
        }
    }

    #[test]
    fn stop_rounds_elapsed_minutes() {
        let mut engine = TimerEngine::default();
        engine.set_session_type(SessionType::DeepWork, t0()).unwrap();
        engine.start(t0()).unwrap();
        let outcome = engine.stop(t0() + Duration::seconds(90)).unwrap();
        let record = outcome.record.unwrap();
        assert_eq!(record.duration_minutes, 2);
        assert!(!record.completed);
        assert_eq!(record.context.session_type, SessionType::DeepWork);
        assert_eq!(engine.status(), TimerStatus::Idle);
        assert_eq!(engine.remaining_secs(), 90 * 60);
    }

    #[test]
    fn stop_under_half_a_minute_records_nothing() {
        let mut engine = TimerEngine::default();
        engine.start(t0()).unwrap();
        let outcome = engine.stop(t0() + Duration::seconds(29)).unwrap();
        assert!(outcome.record.is_none());

        engine.start(t0()).unwrap();
        engine.pause(t0()).unwrap();
        assert!(engine.stop(t0()).unwrap().record.is_none());
    }

    #[test]
    fn reset_twice_is_a_no_op() {
        let mut engine = TimerEngine::default();
        engine.start(t0()).unwrap();
        engine.tick(30, 0, t0());
        engine.pause(t0()).unwrap();

        let first = engine.reset(t0()).unwrap();
        assert_eq!(first.events.len(), 1);
        assert!(first.record.is_none());
        assert_eq!(engine.remaining_secs(), 1500);
        assert!(engine.marker().is_none());

        let second = engine.reset(t0()).unwrap();
        assert_eq!(second, Outcome::default());
        assert_eq!(engine.status(), TimerStatus::Idle);
    }

    #[test]
    fn settings_refresh_idle_but_not_running_countdown() {
        let mut engine = TimerEngine::default();
        engine.set_settings(
            SettingsUpdate {
                pomodoro: Some(500),
                ..Default::default()
            },
            t0(),
        );
        assert_eq!(engine.settings().minutes(SessionType::Pomodoro), 60);
        assert_eq!(engine.remaining_secs(), 3600);

        engine.start(t0()).unwrap();
        engine.tick(60, 0, t0());
        engine.set_settings(
            SettingsUpdate {
                pomodoro: Some(30),
                ..Default::default()
            },
            t0(),
        );
        assert_eq!(engine.remaining_secs(), 3540);
        assert_eq!(engine.total_secs(), 1800);
        assert_eq!(engine.progress_pct(), 0.0);
    }

    #[test]
    fn ticks_outside_running_are_ignored() {
        let mut engine = TimerEngine::default();
        assert_eq!(engine.tick(5, 0, t0()), Outcome::default());
        engine.start(t0()).unwrap();
        engine.pause(t0()).unwrap();
        assert_eq!(engine.tick(5, 0, t0()), Outcome::default());
        assert_eq!(engine.remaining_secs(), 1500);
    }

    #[test]
    fn oversized_tick_completes_once() {
        let mut engine = TimerEngine::default();
        engine.start(t0()).unwrap();
        let outcome = engine.tick(10_000, 0, t0());
        assert!(outcome.record.is_some());
        assert_eq!(engine.tick(1, 0, t0()), Outcome::default());
    }

    #[test]
    fn snapshot_reports_progress() {
        let mut engine = TimerEngine::default();
        engine.start(t0()).unwrap();
        engine.tick(750, 0, t0());
        let snap = engine.snapshot(t0());
        assert_eq!(snap.status, TimerStatus::Running);
        assert_eq!(snap.remaining_secs, 750);
        assert_eq!(snap.total_secs, 1500);
        assert!((snap.progress_pct - 50.0).abs() < f64::EPSILON);
        assert_eq!(engine.format_remaining(), "12:30");
    }

    #[test]
    fn elapsed_minutes_round_half_up() {
        assert_eq!(elapsed_minutes_between(t0(), t0()), 0);
        assert_eq!(elapsed_minutes_between(t0(), t0() + Duration::seconds(30)), 1);
        assert_eq!(elapsed_minutes_between(t0(), t0() + Duration::seconds(89)), 1);
        assert_eq!(elapsed_minutes_between(t0(), t0() - Duration::seconds(120)), 0);
    }

    proptest! {
        #[test]
        fn pause_and_resume_preserve_remaining(ticks in 0u64..1499, pause_gap in 0i64..10_000) {
            let mut engine = TimerEngine::default();
            engine.start(t0()).unwrap();
            engine.tick(ticks, 0, t0());
            let before = engine.remaining_secs();
            engine.pause(t0()).unwrap();
            engine.start(t0() + Duration::seconds(pause_gap)).unwrap();
            prop_assert_eq!(engine.remaining_secs(), before);
            prop_assert_eq!(before, 1500 - ticks);
        }
    }
}
