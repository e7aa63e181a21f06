//! Record kinds held by the entity store: tasks, study sessions and goals.

mod goal;
mod session;
mod task;

pub use goal::{validate_progress, Goal};
pub use session::{validate_rating, Session};
pub use task::{derive_display_status, DisplayStatus, Priority, Task, TaskCategory, TaskStatus};

use serde::{Deserialize, Deserializer};

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
