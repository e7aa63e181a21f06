//! Turns finished countdowns into Session records.
//!
//! A completed countdown attached to a task also adds its minutes to the
//! task's `actual_hours`. That second write is best-effort: the session
//! stays saved when it fails.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::error::{PersistenceError, StoreError};
use crate::model::{Session, Task};
use crate::storage::{EntityKind, EntityStore};
use crate::timer::SessionType;

/// What a session record is about, captured when the countdown started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub task_id: Option<String>,
    pub session_type: SessionType,
    pub notes: String,
}

/// Result of the follow-up write to the session's task.
#[derive(Debug)]
pub enum TaskHoursUpdate {
    /// No task attached, or the session was not completed.
    NotRequested,
    Updated(Task),
    Failed(StoreError),
}

/// Result of [`SessionRecorder::record_session`].
#[derive(Debug)]
pub enum Recorded {
    /// Zero-minute sessions are never written.
    Skipped,
    Saved {
        session: Session,
        task_update: TaskHoursUpdate,
    },
}

/// Writes sessions (and task hours) to an entity store.
pub struct SessionRecorder<S> {
    store: S,
}

impl<S: EntityStore> SessionRecorder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist one finished countdown.
    ///
    /// # Errors
    /// Returns an error only if the session itself could not be created.
    pub async fn record_session(
        &self,
        duration_minutes: u32,
        completed: bool,
        context: &SessionContext,
    ) -> Result<Recorded, PersistenceError> {
        if duration_minutes == 0 {
            return Ok(Recorded::Skipped);
        }

        let session: Session = self
            .store
            .create(json!({
                "task_id": context.task_id,
                "duration_minutes": duration_minutes,
                "session_type": context.session_type,
                "notes": context.notes,
                "completed": completed,
            }))
            .await
            .map_err(|source| PersistenceError {
                what: "session",
                source,
            })?;
        info!(
            id = %session.id,
            session_type = %session.session_type,
            duration_minutes,
            completed,
            "session recorded"
        );

        let task_update = match (&context.task_id, completed) {
            (Some(task_id), true) => match self.add_task_hours(task_id, duration_minutes).await {
                Ok(task) => TaskHoursUpdate::Updated(task),
                Err(e) => {
                    warn!(task_id = %task_id, error = %e, "failed to update task hours");
                    TaskHoursUpdate::Failed(e)
                }
            },
            _ => TaskHoursUpdate::NotRequested,
        };

        Ok(Recorded::Saved {
            session,
            task_update,
        })
    }

    async fn add_task_hours(&self, task_id: &str, minutes: u32) -> Result<Task, StoreError> {
        let task: Task = self
            .store
            .get(task_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Task,
                id: task_id.to_string(),
            })?;
        let actual_hours = task.actual_hours.unwrap_or(0.0) + f64::from(minutes) / 60.0;
        self.store
            .update(task_id, json!({ "actual_hours": actual_hours }))
            .await
    }
}
