mod controller;
mod driver;
mod engine;
mod settings;

pub use controller::{TimerController, EVENT_CHANNEL_CAPACITY};
pub use driver::{run_timer_loop, TimerCommand};
pub use engine::{
    elapsed_minutes_between, Outcome, RecordRequest, SessionMarker, TimerEngine, TimerSnapshot,
    TimerStatus, POMODOROS_PER_LONG_BREAK,
};
pub use settings::{MinuteRange, SessionType, SettingsUpdate, TimerSettings};
