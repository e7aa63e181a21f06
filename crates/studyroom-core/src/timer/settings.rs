use serde::{Deserialize, Serialize};

/// Kind of countdown the timer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Pomodoro,
    ShortBreak,
    LongBreak,
    DeepWork,
}

wire_enum!(SessionType {
    Pomodoro => "pomodoro",
    ShortBreak => "short_break",
    LongBreak => "long_break",
    DeepWork => "deep_work",
});

impl SessionType {
    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Pomodoro => "Pomodoro",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
            SessionType::DeepWork => "Deep Work",
        }
    }
}

/// Inclusive bounds in minutes for one session type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MinuteRange {
    pub min: u32,
    pub max: u32,
}

impl MinuteRange {
    pub fn clamp(&self, minutes: i64) -> u32 {
        minutes.clamp(self.min as i64, self.max as i64) as u32
    }
}

/// Countdown lengths in minutes, one per session type.
///
/// Values are clamped to their [`MinuteRange`] on every write, so a stored
/// value is always in range. Settings are process-local and start from the
/// defaults on every launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerSettings {
    pomodoro: u32,
    short_break: u32,
    long_break: u32,
    deep_work: u32,
}

/// Partial settings change. Missing values keep their current setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub pomodoro: Option<i64>,
    #[serde(default)]
    pub short_break: Option<i64>,
    #[serde(default)]
    pub long_break: Option<i64>,
    #[serde(default)]
    pub deep_work: Option<i64>,
}

impl SettingsUpdate {
    pub fn set(&mut self, session_type: SessionType, minutes: i64) {
        let slot = match session_type {
            SessionType::Pomodoro => &mut self.pomodoro,
            SessionType::ShortBreak => &mut self.short_break,
            SessionType::LongBreak => &mut self.long_break,
            SessionType::DeepWork => &mut self.deep_work,
        };
        *slot = Some(minutes);
    }

    pub fn is_empty(&self) -> bool {
        self.pomodoro.is_none()
            && self.short_break.is_none()
            && self.long_break.is_none()
            && self.deep_work.is_none()
    }
}

impl TimerSettings {
    pub const DEFAULT_POMODORO: u32 = 25;
    pub const DEFAULT_SHORT_BREAK: u32 = 5;
    pub const DEFAULT_LONG_BREAK: u32 = 15;
    pub const DEFAULT_DEEP_WORK: u32 = 90;

    /// Build settings from raw minute values, clamping each one.
    pub fn new(pomodoro: i64, short_break: i64, long_break: i64, deep_work: i64) -> Self {
        let mut settings = Self::default();
        settings.apply(SettingsUpdate {
            pomodoro: Some(pomodoro),
            short_break: Some(short_break),
            long_break: Some(long_break),
            deep_work: Some(deep_work),
        });
        settings
    }

    pub fn range(session_type: SessionType) -> MinuteRange {
        match session_type {
            SessionType::Pomodoro => MinuteRange { min: 1, max: 60 },
            SessionType::ShortBreak => MinuteRange { min: 1, max: 30 },
            SessionType::LongBreak => MinuteRange { min: 1, max: 60 },
            SessionType::DeepWork => MinuteRange { min: 30, max: 120 },
        }
    }

    pub fn minutes(&self, session_type: SessionType) -> u32 {
        match session_type {
            SessionType::Pomodoro => self.pomodoro,
            SessionType::ShortBreak => self.short_break,
            SessionType::LongBreak => self.long_break,
            SessionType::DeepWork => self.deep_work,
        }
    }

    /// Countdown length in seconds.
    pub fn duration_secs(&self, session_type: SessionType) -> u64 {
        u64::from(self.minutes(session_type)) * 60
    }

    /// Store a new value for one type, clamped to its range.
    pub fn set(&mut self, session_type: SessionType, minutes: i64) {
        let clamped = Self::range(session_type).clamp(minutes);
        let slot = match session_type {
            SessionType::Pomodoro => &mut self.pomodoro,
            SessionType::ShortBreak => &mut self.short_break,
            SessionType::LongBreak => &mut self.long_break,
            SessionType::DeepWork => &mut self.deep_work,
        };
        *slot = clamped;
    }

    pub fn apply(&mut self, update: SettingsUpdate) {
        let pairs = [
            (SessionType::Pomodoro, update.pomodoro),
            (SessionType::ShortBreak, update.short_break),
            (SessionType::LongBreak, update.long_break),
            (SessionType::DeepWork, update.deep_work),
        ];
        for (session_type, minutes) in pairs {
            if let Some(minutes) = minutes {
                self.set(session_type, minutes);
            }
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            pomodoro: Self::DEFAULT_POMODORO,
            short_break: Self::DEFAULT_SHORT_BREAK,
            long_break: Self::DEFAULT_LONG_BREAK,
            deep_work: Self::DEFAULT_DEEP_WORK,
        }
    }
}
