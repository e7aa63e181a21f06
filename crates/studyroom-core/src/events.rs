use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::timer::{SessionType, TimerSettings, TimerSnapshot};

/// Every timer state change and record write produces an Event.
/// UIs subscribe to them through the timer controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        session_type: SessionType,
        remaining_secs: u64,
        task_id: Option<String>,
        /// True when continuing a paused countdown.
        resumed: bool,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerTicked {
        remaining_secs: u64,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
    /// Countdown ended early by the user.
    TimerStopped {
        session_type: SessionType,
        elapsed_minutes: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        session_type: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero on its own.
    TimerCompleted {
        session_type: SessionType,
        duration_minutes: u32,
        at: DateTime<Utc>,
    },
    /// A finished pomodoro selected the next break.
    AutoChained {
        from: SessionType,
        to: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionTypeChanged {
        from: SessionType,
        to: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SettingsChanged {
        settings: TimerSettings,
        at: DateTime<Utc>,
    },
    SessionRecorded {
        session_id: String,
        session_type: SessionType,
        duration_minutes: u32,
        completed: bool,
        at: DateTime<Utc>,
    },
    TaskHoursUpdated {
        task_id: String,
        actual_hours: f64,
        at: DateTime<Utc>,
    },
    /// A record write failed. The timer state has not been rolled back.
    PersistenceFailed {
        message: String,
        at: DateTime<Utc>,
    },
    /// A command was rejected in the current state.
    CommandRejected {
        message: String,
        at: DateTime<Utc>,
    },
    StateSnapshot(TimerSnapshot),
}

impl Event {
    /// Wire name of the variant, as used in the `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Event::TimerStarted { .. } => "timer_started",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerTicked { .. } => "timer_ticked",
            Event::TimerStopped { .. } => "timer_stopped",
            Event::TimerReset { .. } => "timer_reset",
            Event::TimerCompleted { .. } => "timer_completed",
            Event::AutoChained { .. } => "auto_chained",
            Event::SessionTypeChanged { .. } => "session_type_changed",
            Event::SettingsChanged { .. } => "settings_changed",
            Event::SessionRecorded { .. } => "session_recorded",
            Event::TaskHoursUpdated { .. } => "task_hours_updated",
            Event::PersistenceFailed { .. } => "persistence_failed",
            Event::CommandRejected { .. } => "command_rejected",
            Event::StateSnapshot(_) => "state_snapshot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::AutoChained {
            from: SessionType::Pomodoro,
            to: SessionType::LongBreak,
            remaining_secs: 900,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
        assert_eq!(json["to"], "long_break");
    }
}
