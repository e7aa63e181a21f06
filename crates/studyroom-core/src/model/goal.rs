use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::storage::{Entity, EntityKind};

/// Weekly study-hours goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub target_hours_weekly: f64,
    /// Percent of the weekly target reached.
    #[serde(default)]
    pub current_progress: f64,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
}

impl Goal {
    /// Progress clamped to 0..=100 for display.
    pub fn progress_pct(&self) -> f64 {
        self.current_progress.clamp(0.0, 100.0)
    }
}

/// Check a new progress percentage, clamping finite values to 0..=100.
pub fn validate_progress(percent: f64) -> Result<f64, ValidationError> {
    if percent.is_finite() {
        Ok(percent.clamp(0.0, 100.0))
    } else {
        Err(ValidationError::InvalidValue {
            field: "current_progress".to_string(),
            message: format!("{percent} is not a number"),
        })
    }
}

impl Entity for Goal {
    const KIND: EntityKind = EntityKind::Goal;

    fn id(&self) -> &str {
        &self.id
    }
}
