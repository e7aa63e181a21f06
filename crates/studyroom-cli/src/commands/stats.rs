use chrono::Utc;
use clap::Subcommand;
use studyroom_core::dashboard::{task_stats, today_summary, weekly_progress, DashboardSummary};
use studyroom_core::{Config, EntityStore, Goal, Session, Task};

use super::{open_store, print_json, runtime, CliResult};

/// The dashboard looks at this many of the newest records.
const DASHBOARD_TASKS: usize = 20;
const DASHBOARD_SESSIONS: usize = 10;
const DASHBOARD_GOALS: usize = 5;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Dashboard overview
    Dashboard,
    /// Task counts and estimated hours
    Tasks,
    /// Study hours per day this week
    Week,
    /// Today's sessions and minutes
    Today,
}

pub fn run(action: StatsAction, config: &Config) -> CliResult {
    let store = open_store(config)?;
    let rt = runtime()?;
    let today = Utc::now().date_naive();

    match action {
        StatsAction::Dashboard => {
            let tasks: Vec<Task> =
                rt.block_on(store.list("-created_date", Some(DASHBOARD_TASKS)))?;
            let sessions: Vec<Session> =
                rt.block_on(store.list("-created_date", Some(DASHBOARD_SESSIONS)))?;
            let goals: Vec<Goal> =
                rt.block_on(store.list("-created_date", Some(DASHBOARD_GOALS)))?;
            print_json(&DashboardSummary::build(&tasks, &sessions, &goals, today))?;
        }
        StatsAction::Tasks => {
            let tasks: Vec<Task> = rt.block_on(store.list("-created_date", None))?;
            print_json(&task_stats(&tasks, today))?;
        }
        StatsAction::Week => {
            let sessions: Vec<Session> = rt.block_on(store.list("-created_date", None))?;
            print_json(&weekly_progress(&sessions, today))?;
        }
        StatsAction::Today => {
            let sessions: Vec<Session> = rt.block_on(store.list("-created_date", None))?;
            print_json(&today_summary(&sessions, today))?;
        }
    }
    Ok(())
}
