//! Entity storage and configuration.
//!
//! Every record kind goes through the same four calls (list, create,
//! update, delete) plus a single-record `get`. Two backends implement
//! [`EntityStore`]: a local SQLite file holding one JSON document per record,
//! and a client for a remote REST entity API.

mod config;
pub mod remote;
pub mod sqlite;

pub use config::{Config, HistoryConfig, LogConfig, StoreBackendKind, StoreConfig};
pub use remote::RemoteStore;
pub use sqlite::SqliteStore;

use std::cmp::Ordering;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, CoreError, StoreError};

/// Returns `~/.config/studyroom[-dev]/` based on STUDYROOM_ENV.
///
/// Set STUDYROOM_ENV=dev to use the development data directory, and
/// STUDYROOM_HOME to replace `~/.config` as the parent directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = match std::env::var_os("STUDYROOM_HOME") {
        Some(home) => PathBuf::from(home),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config"),
    };

    let env = std::env::var("STUDYROOM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("studyroom-dev")
    } else {
        base_dir.join("studyroom")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Record kinds held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Task,
    Session,
    Goal,
}

impl EntityKind {
    /// Collection name used by the entity API and the SQLite `kind` column.
    pub fn api_name(&self) -> &'static str {
        match self {
            EntityKind::Task => "StudyTask",
            EntityKind::Session => "StudySession",
            EntityKind::Goal => "StudyGoal",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EntityKind::Task => "task",
            EntityKind::Session => "session",
            EntityKind::Goal => "goal",
        })
    }
}

/// A record type the store can hold.
pub trait Entity: DeserializeOwned {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

/// List/create/update/delete access to the three record kinds.
///
/// Calls are independent round trips: there are no transactions across
/// records, and a failed call leaves earlier calls in place.
#[allow(async_fn_in_trait)]
pub trait EntityStore {
    /// Records of one kind ordered by `order_by` (`-field` for descending),
    /// truncated to `limit`.
    async fn list<E: Entity>(&self, order_by: &str, limit: Option<usize>)
        -> Result<Vec<E>, StoreError>;

    async fn get<E: Entity>(&self, id: &str) -> Result<Option<E>, StoreError>;

    /// Create a record from a JSON object. The store assigns `id` and
    /// `created_date`.
    async fn create<E: Entity>(&self, fields: Value) -> Result<E, StoreError>;

    /// Merge `fields` into an existing record.
    async fn update<E: Entity>(&self, id: &str, fields: Value) -> Result<E, StoreError>;

    async fn delete<E: Entity>(&self, id: &str) -> Result<(), StoreError>;
}

/// Parsed `orderBy` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let raw = raw.trim();
        let (field, descending) = match raw.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        if field.is_empty() || field.starts_with('-') {
            return Err(StoreError::InvalidOrder(raw.to_string()));
        }
        Ok(Self {
            field: field.to_string(),
            descending,
        })
    }

    /// Sort JSON documents in place. Documents missing the field (or holding
    /// `null`) go last in either direction; ties keep the newest-inserted
    /// document first when descending.
    pub fn sort(&self, docs: &mut Vec<Value>) {
        if self.descending {
            docs.reverse();
        }
        docs.sort_by(|a, b| {
            let x = a.get(&self.field).filter(|v| !v.is_null());
            let y = b.get(&self.field).filter(|v| !v.is_null());
            match (x, y) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(x), Some(y)) => {
                    let ord = compare_values(x, y);
                    if self.descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                }
            }
        });
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

pub(crate) fn decode<E: Entity>(doc: Value) -> Result<E, StoreError> {
    serde_json::from_value(doc).map_err(|source| StoreError::Decode {
        kind: E::KIND,
        source,
    })
}

/// Either backend, chosen from configuration at runtime.
pub enum StoreBackend {
    Sqlite(SqliteStore),
    Remote(RemoteStore),
}

impl StoreBackend {
    /// Open the backend named by the `[store]` configuration section.
    pub fn from_config(config: &StoreConfig) -> Result<Self, CoreError> {
        match config.backend {
            StoreBackendKind::Sqlite => {
                let path = match &config.sqlite_path {
                    Some(path) => PathBuf::from(path),
                    None => data_dir().map_err(ConfigError::DataDir)?.join("studyroom.db"),
                };
                Ok(Self::Sqlite(SqliteStore::open(path)?))
            }
            StoreBackendKind::Remote => {
                let url = config.remote_url.as_deref().ok_or_else(|| {
                    ConfigError::InvalidValue {
                        key: "store.remote_url".to_string(),
                        message: "required when store.backend = \"remote\"".to_string(),
                    }
                })?;
                Ok(Self::Remote(RemoteStore::new(url, config.api_key.clone())?))
            }
        }
    }
}

impl EntityStore for StoreBackend {
    async fn list<E: Entity>(
        &self,
        order_by: &str,
        limit: Option<usize>,
    ) -> Result<Vec<E>, StoreError> {
        match self {
            Self::Sqlite(store) => store.list(order_by, limit).await,
            Self::Remote(store) => store.list(order_by, limit).await,
        }
    }

    async fn get<E: Entity>(&self, id: &str) -> Result<Option<E>, StoreError> {
        match self {
            Self::Sqlite(store) => store.get(id).await,
            Self::Remote(store) => store.get(id).await,
        }
    }

    async fn create<E: Entity>(&self, fields: Value) -> Result<E, StoreError> {
        match self {
            Self::Sqlite(store) => store.create(fields).await,
            Self::Remote(store) => store.create(fields).await,
        }
    }

    async fn update<E: Entity>(&self, id: &str, fields: Value) -> Result<E, StoreError> {
        match self {
            Self::Sqlite(store) => store.update(id, fields).await,
            Self::Remote(store) => store.update(id, fields).await,
        }
    }

    async fn delete<E: Entity>(&self, id: &str) -> Result<(), StoreError> {
        match self {
            Self::Sqlite(store) => store.delete::<E>(id).await,
            Self::Remote(store) => store.delete::<E>(id).await,
        }
    }
}
