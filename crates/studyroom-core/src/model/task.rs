use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;
use crate::storage::{Entity, EntityKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

wire_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

/// Stored task status. "Overdue" is never stored; see [`DisplayStatus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

wire_enum!(TaskStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
});

/// Status shown to the user, derived from the stored status and due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Pending,
    InProgress,
    Completed,
    Overdue,
}

wire_enum!(DisplayStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Overdue => "overdue",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    #[default]
    Assignment,
    Exam,
    Reading,
    Project,
    Revision,
    Other,
}

wire_enum!(TaskCategory {
    Assignment => "assignment",
    Exam => "exam",
    Reading => "reading",
    Project => "project",
    Revision => "revision",
    Other => "other",
});

/// A piece of study work with a due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: Priority,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
    /// Hours accumulated from completed timer sessions.
    #[serde(default)]
    pub actual_hours: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: TaskCategory,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_date: Option<DateTime<Utc>>,
}

impl Task {
    /// Whole days from `today` until the due date; negative once past due.
    pub fn days_until_due(&self, today: NaiveDate) -> Option<i64> {
        self.due_date.map(|due| (due - today).num_days())
    }

    pub fn display_status(&self, today: NaiveDate) -> DisplayStatus {
        derive_display_status(self, today)
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &str {
        &self.id
    }
}

/// The status to show for a task on `today`.
///
/// Completed wins over everything; an unfinished task whose due date has
/// passed is overdue; otherwise the stored status is shown.
pub fn derive_display_status(task: &Task, today: NaiveDate) -> DisplayStatus {
    if task.is_completed() {
        return DisplayStatus::Completed;
    }
    if task.due_date.is_some_and(|due| due < today) {
        return DisplayStatus::Overdue;
    }
    match task.status {
        TaskStatus::Pending => DisplayStatus::Pending,
        TaskStatus::InProgress => DisplayStatus::InProgress,
        TaskStatus::Completed => DisplayStatus::Completed,
    }
}
