//! Dashboard aggregates and task list views.
//!
//! Everything here is a pure function over already-fetched lists. Day
//! boundaries are UTC calendar days; callers pass `today` explicitly.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::{DisplayStatus, Goal, Priority, Session, Task, TaskCategory, TaskStatus};

/// Tasks due within this many days show up as upcoming.
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

pub use crate::model::derive_display_status;

/// Whole days until the task is due, negative once overdue.
pub fn days_until_due(task: &Task, today: NaiveDate) -> Option<i64> {
    task.days_until_due(today)
}

/// Unfinished tasks due by `today + 7 days` (overdue ones included), soonest
/// first. Tasks without a due date are left out.
pub fn upcoming_tasks(tasks: &[Task], today: NaiveDate) -> Vec<&Task> {
    let horizon = today + Duration::days(UPCOMING_WINDOW_DAYS);
    let mut upcoming: Vec<&Task> = tasks
        .iter()
        .filter(|t| !t.is_completed())
        .filter(|t| t.due_date.is_some_and(|due| due <= horizon))
        .collect();
    upcoming.sort_by_key(|t| t.due_date);
    upcoming
}

pub fn total_study_hours(sessions: &[Session]) -> f64 {
    sessions.iter().map(Session::hours).sum()
}

/// Mean productivity rating; unrated sessions count as 0.
pub fn average_productivity(sessions: &[Session]) -> f64 {
    if sessions.is_empty() {
        return 0.0;
    }
    let sum: u32 = sessions
        .iter()
        .map(|s| u32::from(s.productivity_rating.unwrap_or(0)))
        .sum();
    f64::from(sum) / sessions.len() as f64
}

/// Counts shown above the task list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub overdue: usize,
    pub estimated_hours: f64,
}

pub fn task_stats(tasks: &[Task], today: NaiveDate) -> TaskStats {
    let mut stats = TaskStats {
        total: tasks.len(),
        ..TaskStats::default()
    };
    for task in tasks {
        match task.status {
            TaskStatus::Completed => stats.completed += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Pending => {}
        }
        if task.display_status(today) == DisplayStatus::Overdue {
            stats.overdue += 1;
        }
        stats.estimated_hours += task.estimated_hours.unwrap_or(0.0);
    }
    stats
}

/// Percent of tasks completed, rounded; 0 for an empty list.
pub fn task_completion_pct(tasks: &[Task]) -> u32 {
    if tasks.is_empty() {
        return 0;
    }
    let completed = tasks.iter().filter(|t| t.is_completed()).count();
    (completed as f64 / tasks.len() as f64 * 100.0).round() as u32
}

/// Study time on one day of the week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayProgress {
    pub date: NaiveDate,
    /// Short weekday name, e.g. `Mon`.
    pub day: String,
    /// Rounded to one decimal.
    pub hours: f64,
    pub sessions: usize,
}

/// Monday through Sunday of the week containing `today`.
pub fn weekly_progress(sessions: &[Session], today: NaiveDate) -> Vec<DayProgress> {
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    (0..7)
        .map(|offset| {
            let date = monday + Duration::days(offset);
            let on_day: Vec<&Session> = sessions
                .iter()
                .filter(|s| session_day(s) == Some(date))
                .collect();
            let minutes: u32 = on_day.iter().map(|s| s.duration_minutes).sum();
            DayProgress {
                date,
                day: date.format("%a").to_string(),
                hours: round_tenth(f64::from(minutes) / 60.0),
                sessions: on_day.len(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TodaySummary {
    pub sessions: usize,
    pub minutes: u32,
    /// Rounded to one decimal.
    pub hours: f64,
}

pub fn today_summary(sessions: &[Session], today: NaiveDate) -> TodaySummary {
    let (count, minutes) = sessions
        .iter()
        .filter(|s| session_day(s) == Some(today))
        .fold((0, 0), |(n, m), s| (n + 1, m + s.duration_minutes));
    TodaySummary {
        sessions: count,
        minutes,
        hours: round_tenth(f64::from(minutes) / 60.0),
    }
}

/// Everything the dashboard page shows, computed at once.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary<'a> {
    pub total_study_hours: f64,
    pub completed_tasks: usize,
    pub remaining_tasks: usize,
    pub average_productivity: f64,
    pub completion_pct: u32,
    pub upcoming: Vec<&'a Task>,
    pub week: Vec<DayProgress>,
    pub goals: &'a [Goal],
}

impl<'a> DashboardSummary<'a> {
    pub fn build(
        tasks: &'a [Task],
        sessions: &[Session],
        goals: &'a [Goal],
        today: NaiveDate,
    ) -> Self {
        let completed_tasks = tasks.iter().filter(|t| t.is_completed()).count();
        Self {
            total_study_hours: total_study_hours(sessions),
            completed_tasks,
            remaining_tasks: tasks.len() - completed_tasks,
            average_productivity: average_productivity(sessions),
            completion_pct: task_completion_pct(tasks),
            upcoming: upcoming_tasks(tasks, today),
            week: weekly_progress(sessions, today),
            goals,
        }
    }
}

/// Task list filter. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub subject: Option<String>,
    pub category: Option<TaskCategory>,
    /// Case-insensitive substring of title, subject or description.
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if self.category.is_some_and(|c| c != task.category) {
            return false;
        }
        if let Some(subject) = &self.subject {
            if subject != &task.subject {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                [&task.title, &task.subject, &task.description]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            }
        }
    }

    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }
}

/// Distinct non-empty subjects, sorted.
pub fn unique_subjects(tasks: &[Task]) -> Vec<String> {
    tasks
        .iter()
        .map(|t| t.subject.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn session_day(session: &Session) -> Option<NaiveDate> {
    session.created_date.map(|at| at.date_naive())
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn task(id: &str, extra: serde_json::Value) -> Task {
        let mut doc = json!({"id": id, "title": format!("Task {id}")});
        if let (Some(doc), Some(extra)) = (doc.as_object_mut(), extra.as_object()) {
            doc.extend(extra.clone());
        }
        serde_json::from_value(doc).unwrap()
    }

    fn session(minutes: u32, at: &str, rating: Option<u8>) -> Session {
        serde_json::from_value(json!({
            "id": format!("s-{at}-{minutes}"),
            "duration_minutes": minutes,
            "session_type": "pomodoro",
            "completed": true,
            "productivity_rating": rating,
            "created_date": at,
        }))
        .unwrap()
    }

    #[test]
    fn upcoming_includes_overdue_and_skips_undated() {
        let today = date("2026-03-10");
        let tasks = vec![
            task("later", json!({"due_date": "2026-03-20"})),
            task("soon", json!({"due_date": "2026-03-17"})),
            task("late", json!({"due_date": "2026-03-01"})),
            task("done", json!({"due_date": "2026-03-11", "status": "completed"})),
            task("undated", json!({})),
        ];
        let ids: Vec<_> = upcoming_tasks(&tasks, today)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, ["late", "soon"]);
    }

    #[test]
    fn productivity_counts_unrated_as_zero() {
        assert_eq!(average_productivity(&[]), 0.0);
        let sessions = vec![
            session(25, "2026-03-10T09:00:00Z", Some(4)),
            session(25, "2026-03-10T10:00:00Z", None),
        ];
        assert!((average_productivity(&sessions) - 2.0).abs() < 1e-9);
        assert!((total_study_hours(&sessions) - 50.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn stats_and_completion() {
        let today = date("2026-03-10");
        let tasks = vec![
            task("a", json!({"status": "completed", "estimated_hours": 2.0})),
            task("b", json!({"status": "in_progress", "due_date": "2026-03-01"})),
            task("c", json!({"estimated_hours": 1.5})),
        ];
        let stats = task_stats(&tasks, today);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.overdue, 1);
        assert!((stats.estimated_hours - 3.5).abs() < 1e-9);
        assert_eq!(task_completion_pct(&tasks), 33);
        assert_eq!(task_completion_pct(&[]), 0);
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        // 2026-03-11 is a Wednesday.
        let today = date("2026-03-11");
        let sessions = vec![
            session(25, "2026-03-09T08:00:00Z", None),
            session(50, "2026-03-09T20:00:00Z", None),
            session(90, "2026-03-15T12:00:00Z", None),
            session(25, "2026-03-08T12:00:00Z", None),
        ];
        let week = weekly_progress(&sessions, today);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, date("2026-03-09"));
        assert_eq!(week[0].day, "Mon");
        assert_eq!(week[0].sessions, 2);
        assert!((week[0].hours - 1.3).abs() < 1e-9);
        assert_eq!(week[6].day, "Sun");
        assert!((week[6].hours - 1.5).abs() < 1e-9);
        assert_eq!(week.iter().map(|d| d.sessions).sum::<usize>(), 3);
    }

    #[test]
    fn today_summary_uses_utc_day() {
        let sessions = vec![
            session(25, "2026-03-10T00:10:00Z", None),
            session(40, "2026-03-10T23:50:00Z", None),
            session(25, "2026-03-09T23:59:00Z", None),
        ];
        let summary = today_summary(&sessions, date("2026-03-10"));
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.minutes, 65);
        assert!((summary.hours - 1.1).abs() < 1e-9);
    }

    #[test]
    fn filter_combines_fields_and_search() {
        let tasks = vec![
            task("a", json!({"subject": "Biology", "priority": "high", "description": "Cell division notes"})),
            task("b", json!({"subject": "History", "priority": "high"})),
            task("c", json!({"subject": "Biology", "priority": "low", "category": "exam"})),
        ];
        let filter = TaskFilter {
            priority: Some(Priority::High),
            search: Some("CELL".into()),
            ..Default::default()
        };
        let ids: Vec<_> = filter.apply(&tasks).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a"]);

        let filter = TaskFilter {
            subject: Some("Biology".into()),
            category: Some(TaskCategory::Exam),
            ..Default::default()
        };
        assert_eq!(filter.apply(&tasks).len(), 1);
        assert_eq!(TaskFilter::default().apply(&tasks).len(), 3);
    }

    #[test]
    fn subjects_are_sorted_and_unique() {
        let tasks = vec![
            task("a", json!({"subject": "Physics"})),
            task("b", json!({"subject": "Biology"})),
            task("c", json!({"subject": "Physics"})),
            task("d", json!({})),
        ];
        assert_eq!(unique_subjects(&tasks), ["Biology", "Physics"]);
    }

    #[test]
    fn summary_builds_from_lists() {
        let today = date("2026-03-10");
        let tasks = vec![task("a", json!({"status": "completed"})), task("b", json!({}))];
        let summary = DashboardSummary::build(&tasks, &[], &[], today);
        assert_eq!(summary.completed_tasks, 1);
        assert_eq!(summary.remaining_tasks, 1);
        assert_eq!(summary.completion_pct, 50);
        assert_eq!(summary.week.len(), 7);
    }
}
