//! Core error types for studyroom-core.
//!
//! Errors are split by where they come from: invalid timer transitions are
//! synchronous and leave state untouched, store errors come back from the
//! entity store, and persistence errors wrap a store error raised after the
//! timer has already moved on.

use std::path::PathBuf;
use thiserror::Error;

use crate::storage::EntityKind;
use crate::timer::TimerStatus;

/// Core error type for studyroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Entity store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Session or task write failed after a timer transition
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Invalid timer transition
    #[error("Invalid transition: {0}")]
    Transition(#[from] TransitionError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Entity store errors, shared by the SQLite and remote backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the local database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// SQLite query failed
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// HTTP transport failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Entity API answered with a non-success status
    #[error("Entity API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// No record with this id
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    /// Stored or received document does not match the record shape
    #[error("Failed to decode {kind} record: {source}")]
    Decode {
        kind: EntityKind,
        #[source]
        source: serde_json::Error,
    },

    /// Create/update payload was not a JSON object
    #[error("Fields for {kind} must be a JSON object")]
    InvalidFields { kind: EntityKind },

    /// Empty or malformed `orderBy` argument
    #[error("Invalid order field: '{0}'")]
    InvalidOrder(String),

    /// Entity API base URL is unusable
    #[error("Invalid entity API URL: {0}")]
    InvalidUrl(String),
}

/// A record write that failed after the timer state already advanced.
#[derive(Error, Debug)]
#[error("failed to save {what}: {source}")]
pub struct PersistenceError {
    pub what: &'static str,
    #[source]
    pub source: StoreError,
}

/// Rejected timer command. The timer state is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {command} while {status}")]
    NotAllowed {
        command: &'static str,
        status: TimerStatus,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be created
    #[error("Data directory unavailable: {0}")]
    DataDir(#[from] std::io::Error),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Unknown wire name for one of the string enums.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
