use clap::Subcommand;
use serde_json::json;
use studyroom_core::model::validate_progress;
use studyroom_core::{Config, EntityStore, Goal};

use super::{open_store, print_json, runtime, CliResult};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a weekly goal
    Create {
        title: String,
        /// Target study hours per week
        #[arg(long, default_value = "10")]
        target_hours: f64,
    },
    /// List goals, newest first
    List {
        #[arg(long, default_value = "5")]
        limit: usize,
    },
    /// Set a goal's progress percentage
    Progress {
        /// Goal ID
        id: String,
        percent: f64,
    },
    /// Delete a goal
    Delete {
        /// Goal ID
        id: String,
    },
}

pub fn run(action: GoalAction, config: &Config) -> CliResult {
    let store = open_store(config)?;
    let rt = runtime()?;

    match action {
        GoalAction::Create {
            title,
            target_hours,
        } => {
            let goal: Goal = rt.block_on(store.create(json!({
                "title": title,
                "target_hours_weekly": target_hours,
                "current_progress": 0,
            })))?;
            print_json(&goal)?;
        }
        GoalAction::List { limit } => {
            let goals: Vec<Goal> = rt.block_on(store.list("-created_date", Some(limit)))?;
            print_json(&goals)?;
        }
        GoalAction::Progress { id, percent } => {
            let percent = validate_progress(percent)?;
            let goal: Goal =
                rt.block_on(store.update(&id, json!({ "current_progress": percent })))?;
            print_json(&goal)?;
        }
        GoalAction::Delete { id } => {
            rt.block_on(store.delete::<Goal>(&id))?;
            eprintln!("Goal deleted: {id}");
        }
    }
    Ok(())
}
