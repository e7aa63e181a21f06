//! Task management commands for CLI.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use serde_json::{json, Map, Value};
use studyroom_core::dashboard::{unique_subjects, upcoming_tasks, TaskFilter};
use studyroom_core::{
    Config, EntityStore, Priority, StoreBackend, Task, TaskCategory, TaskStatus,
};

use super::{open_store, print_json, runtime, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        /// Subject, e.g. "Biology"
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// low, medium, high or urgent
        #[arg(long)]
        priority: Option<Priority>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Estimated hours
        #[arg(long)]
        estimate: Option<f64>,
        /// assignment, exam, reading, project, revision or other
        #[arg(long)]
        category: Option<TaskCategory>,
    },
    /// List tasks, newest first
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        category: Option<TaskCategory>,
        /// Case-insensitive text in title, subject or description
        #[arg(long)]
        search: Option<String>,
        /// Only unfinished tasks due within a week, soonest first
        #[arg(long)]
        upcoming: bool,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long)]
        estimate: Option<f64>,
        #[arg(long)]
        category: Option<TaskCategory>,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Mark a task in progress
    Start {
        /// Task ID
        id: String,
    },
    /// Mark a task completed
    Complete {
        /// Task ID
        id: String,
    },
    /// List distinct subjects
    Subjects,
}

pub fn run(action: TaskAction, config: &Config) -> CliResult {
    let store = open_store(config)?;
    runtime()?.block_on(execute(action, &store))
}

async fn execute(action: TaskAction, store: &StoreBackend) -> CliResult {
    let today = Utc::now().date_naive();

    match action {
        TaskAction::Create {
            title,
            subject,
            description,
            priority,
            due,
            estimate,
            category,
        } => {
            let mut fields = Map::new();
            fields.insert("title".into(), json!(title));
            fields.insert("status".into(), json!(TaskStatus::Pending));
            fields.insert("priority".into(), json!(priority.unwrap_or_default()));
            fields.insert("category".into(), json!(category.unwrap_or_default()));
            insert_some(&mut fields, "subject", subject);
            insert_some(&mut fields, "description", description);
            insert_some(&mut fields, "due_date", due);
            insert_some(&mut fields, "estimated_hours", estimate);

            let task: Task = store.create(Value::Object(fields)).await?;
            eprintln!("Task created: {}", task.id);
            print_json(&with_display_status(&task, today))?;
        }
        TaskAction::List {
            status,
            priority,
            subject,
            category,
            search,
            upcoming,
        } => {
            let tasks: Vec<Task> = store.list("-created_date", None).await?;
            let filter = TaskFilter {
                status,
                priority,
                subject,
                category,
                search,
            };
            let mut shown = filter.apply(&tasks);
            if upcoming {
                let soon: Vec<&str> = upcoming_tasks(&tasks, today)
                    .iter()
                    .map(|t| t.id.as_str())
                    .collect();
                shown.retain(|t| soon.contains(&t.id.as_str()));
                shown.sort_by_key(|t| t.due_date);
            }
            let out: Vec<Value> = shown
                .into_iter()
                .map(|t| with_display_status(t, today))
                .collect();
            print_json(&out)?;
        }
        TaskAction::Get { id } => {
            let task = get_task(store, &id).await?;
            print_json(&with_display_status(&task, today))?;
        }
        TaskAction::Update {
            id,
            title,
            subject,
            description,
            priority,
            status,
            due,
            estimate,
            category,
        } => {
            let mut fields = Map::new();
            insert_some(&mut fields, "title", title);
            insert_some(&mut fields, "subject", subject);
            insert_some(&mut fields, "description", description);
            insert_some(&mut fields, "priority", priority);
            insert_some(&mut fields, "status", status);
            insert_some(&mut fields, "due_date", due);
            insert_some(&mut fields, "estimated_hours", estimate);
            insert_some(&mut fields, "category", category);
            if fields.is_empty() {
                return Err("nothing to update".into());
            }
            let task: Task = store.update(&id, Value::Object(fields)).await?;
            print_json(&with_display_status(&task, today))?;
        }
        TaskAction::Delete { id } => {
            store.delete::<Task>(&id).await?;
            eprintln!("Task deleted: {id}");
        }
        TaskAction::Start { id } => {
            let task = set_status(store, &id, TaskStatus::InProgress).await?;
            print_json(&with_display_status(&task, today))?;
        }
        TaskAction::Complete { id } => {
            let task = set_status(store, &id, TaskStatus::Completed).await?;
            print_json(&with_display_status(&task, today))?;
        }
        TaskAction::Subjects => {
            let tasks: Vec<Task> = store.list("-created_date", None).await?;
            print_json(&unique_subjects(&tasks))?;
        }
    }
    Ok(())
}

async fn get_task(store: &StoreBackend, id: &str) -> Result<Task, Box<dyn std::error::Error>> {
    store
        .get::<Task>(id)
        .await?
        .ok_or_else(|| format!("task not found: {id}").into())
}

async fn set_status(
    store: &StoreBackend,
    id: &str,
    status: TaskStatus,
) -> Result<Task, Box<dyn std::error::Error>> {
    let task = get_task(store, id).await?;
    if task.status == status {
        return Ok(task);
    }
    Ok(store.update(id, json!({ "status": status })).await?)
}

fn insert_some<T: serde::Serialize>(fields: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        fields.insert(key.to_string(), json!(value));
    }
}

/// Task JSON plus the derived `display_status` and `days_until_due`.
fn with_display_status(task: &Task, today: NaiveDate) -> Value {
    let mut value = json!(task);
    if let Some(obj) = value.as_object_mut() {
        obj.insert("display_status".into(), json!(task.display_status(today)));
        obj.insert("days_until_due".into(), json!(task.days_until_due(today)));
    }
    value
}
