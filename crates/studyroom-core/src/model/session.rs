use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::null_as_default;
use crate::error::ValidationError;
use crate::storage::{Entity, EntityKind};
use crate::timer::SessionType;

/// One recorded study or break countdown. Immutable once created, apart
/// from the productivity rating the user may add later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub duration_minutes: u32,
    pub session_type: SessionType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    /// True when the countdown reached zero, false when stopped early.
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub productivity_rating: Option<u8>,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
}

impl Session {
    pub fn hours(&self) -> f64 {
        f64::from(self.duration_minutes) / 60.0
    }

    pub fn is_completed_pomodoro(&self) -> bool {
        self.completed && self.session_type == SessionType::Pomodoro
    }
}

impl Entity for Session {
    const KIND: EntityKind = EntityKind::Session;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Productivity ratings run from 1 to 5.
pub fn validate_rating(rating: u8) -> Result<u8, ValidationError> {
    if (1..=5).contains(&rating) {
        Ok(rating)
    } else {
        Err(ValidationError::InvalidValue {
            field: "productivity_rating".to_string(),
            message: format!("{rating} is outside 1-5"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_store_document() {
        let s: Session = serde_json::from_str(
            r#"{"id":"s1","task_id":null,"duration_minutes":25,
                "session_type":"pomodoro","notes":null,"completed":true,
                "productivity_rating":null,"created_date":"2026-03-10T09:00:00Z"}"#,
        )
        .unwrap();
        assert!(s.is_completed_pomodoro());
        assert_eq!(s.notes, "");
        assert!((s.hours() - 25.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }
}
