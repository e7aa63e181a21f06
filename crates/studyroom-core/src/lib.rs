//! # Studyroom Core Library
//!
//! Business logic for the Studyroom study planner: a pomodoro/deep-work timer,
//! the recorder that turns finished countdowns into Session records, a generic
//! entity store for tasks, sessions and goals, and the dashboard aggregates
//! computed over them. The `studyroom` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a plain state machine. Every transition takes the
//!   current time explicitly and returns the events and record requests it
//!   produced; it never reads a clock or touches storage.
//! - **Timer Controller**: owns one engine, the recorder and the in-memory
//!   session history, and publishes events to subscribers.
//! - **Event Loop**: ticks the controller once per second while running.
//! - **Storage**: the [`EntityStore`] trait with SQLite and HTTP backends, plus
//!   TOML configuration.
//! - **Dashboard**: pure aggregates over fetched task and session lists.

#[macro_use]
mod macros;

pub mod clock;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod model;
pub mod recorder;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    ConfigError, CoreError, ParseEnumError, PersistenceError, StoreError, TransitionError,
    ValidationError,
};
pub use events::Event;
pub use model::{DisplayStatus, Goal, Priority, Session, Task, TaskCategory, TaskStatus};
pub use recorder::{Recorded, SessionContext, SessionRecorder, TaskHoursUpdate};
pub use storage::{Config, Entity, EntityKind, EntityStore, RemoteStore, SqliteStore, StoreBackend};
pub use timer::{
    run_timer_loop, SessionType, SettingsUpdate, TimerCommand, TimerController, TimerEngine,
    TimerSettings, TimerSnapshot, TimerStatus,
};
