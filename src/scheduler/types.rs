//! Alarm and task entity types.
//!
//! Field names match the persisted JSON documents one-to-one. Create-time
//! inputs ([`AlarmSpec`], [`TaskSpec`]) and partial updates ([`AlarmPatch`],
//! [`TaskPatch`]) are separate types so identifiers and transient state can
//! only be assigned by the owning scheduler.

use crate::audio::catalog::DEFAULT_SOUND;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Default reminder lead time in minutes.
pub const DEFAULT_REMINDER_MINUTES: i64 = 10;

/// Default task colour.
pub const DEFAULT_TASK_COLOR: &str = "#6366f1";

/// Day-of-week tag used in alarm repeat sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    /// Weekday of a local date-time.
    #[must_use]
    pub fn of(moment: &NaiveDateTime) -> Self {
        Self::from(moment.weekday())
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Self::Mon,
            chrono::Weekday::Tue => Self::Tue,
            chrono::Weekday::Wed => Self::Wed,
            chrono::Weekday::Thu => Self::Thu,
            chrono::Weekday::Fri => Self::Fri,
            chrono::Weekday::Sat => Self::Sat,
            chrono::Weekday::Sun => Self::Sun,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Mon => "Mon",
            Self::Tue => "Tue",
            Self::Wed => "Wed",
            Self::Thu => "Thu",
            Self::Fri => "Fri",
            Self::Sat => "Sat",
            Self::Sun => "Sun",
        };
        f.write_str(tag)
    }
}

fn default_sound() -> String {
    DEFAULT_SOUND.to_owned()
}

fn default_true() -> bool {
    true
}

fn default_reminder() -> i64 {
    DEFAULT_REMINDER_MINUTES
}

fn default_color() -> String {
    DEFAULT_TASK_COLOR.to_owned()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A time-of-day alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Unique identifier assigned at creation.
    pub id: String,
    /// Time of day, `"HH:MM"` (24h).
    pub time: String,
    /// Free-text label.
    #[serde(default)]
    pub label: String,
    /// Sound name, resolved against the catalog at fire time.
    #[serde(default = "default_sound")]
    pub sound: String,
    /// Weekdays on which the alarm fires. Empty = every day until deactivated.
    #[serde(default)]
    pub repeat: Vec<Weekday>,
    /// Inactive alarms are kept but never fire.
    #[serde(default = "default_true")]
    pub active: bool,
    /// `true` from fire until dismissed. Never survives a reload.
    #[serde(default)]
    pub ringing: bool,
}

impl Alarm {
    /// Build a new alarm with a fresh identifier.
    #[must_use]
    pub fn from_spec(spec: AlarmSpec) -> Self {
        Self {
            id: new_id(),
            time: spec.time,
            label: spec.label,
            sound: spec.sound,
            repeat: spec.repeat,
            active: spec.active,
            ringing: false,
        }
    }

    /// Apply the fields present in `patch`.
    pub fn apply(&mut self, patch: AlarmPatch) {
        if let Some(time) = patch.time {
            self.time = time;
        }
        if let Some(label) = patch.label {
            self.label = label;
        }
        if let Some(sound) = patch.sound {
            self.sound = sound;
        }
        if let Some(repeat) = patch.repeat {
            self.repeat = repeat;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        if let Some(ringing) = patch.ringing {
            self.ringing = ringing;
        }
    }

    /// Whether this alarm should fire at `now` (minute granularity).
    ///
    /// Does not look at the second; the ticker only scans at second 0.
    #[must_use]
    pub fn is_due_at(&self, now: &NaiveDateTime) -> bool {
        if !self.active || self.ringing {
            return false;
        }
        if self.time != now.format("%H:%M").to_string() {
            return false;
        }
        self.repeat.is_empty() || self.repeat.contains(&Weekday::of(now))
    }
}

/// Fields supplied when creating an alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmSpec {
    pub time: String,
    pub label: String,
    pub sound: String,
    pub repeat: Vec<Weekday>,
    pub active: bool,
}

impl Default for AlarmSpec {
    fn default() -> Self {
        Self {
            time: String::new(),
            label: String::new(),
            sound: default_sound(),
            repeat: Vec::new(),
            active: true,
        }
    }
}

/// Partial alarm update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmPatch {
    pub time: Option<String>,
    pub label: Option<String>,
    pub sound: Option<String>,
    pub repeat: Option<Vec<Weekday>>,
    pub active: Option<bool>,
    pub ringing: Option<bool>,
}

/// A dated task with a lead-time reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier assigned at creation.
    pub id: String,
    /// Free-text title.
    pub title: String,
    /// Calendar date, `"YYYY-MM-DD"`; empty = undated.
    #[serde(default)]
    pub date: String,
    /// Time of day, `"HH:MM"`; empty = untimed.
    #[serde(default)]
    pub time: String,
    /// Reminder lead time in minutes before `date`+`time`.
    #[serde(default = "default_reminder")]
    pub reminder: i64,
    /// Done tasks are never reminded.
    #[serde(default)]
    pub done: bool,
    /// Display colour.
    #[serde(default = "default_color")]
    pub color: String,
    /// Latch set when the reminder fires. Never cleared automatically.
    #[serde(default)]
    pub reminder_fired: bool,
}

impl Task {
    /// Build a new task with a fresh identifier.
    #[must_use]
    pub fn from_spec(spec: TaskSpec) -> Self {
        Self {
            id: new_id(),
            title: spec.title,
            date: spec.date,
            time: spec.time,
            reminder: spec.reminder,
            done: false,
            color: spec.color,
            reminder_fired: false,
        }
    }

    /// Apply the fields present in `patch`.
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(time) = patch.time {
            self.time = time;
        }
        if let Some(reminder) = patch.reminder {
            self.reminder = reminder;
        }
        if let Some(done) = patch.done {
            self.done = done;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(fired) = patch.reminder_fired {
            self.reminder_fired = fired;
        }
    }

    /// Scheduled date-time, if both `date` and `time` are present and valid.
    #[must_use]
    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        if self.date.is_empty() || self.time.is_empty() {
            return None;
        }
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()?;
        let time = NaiveTime::parse_from_str(&self.time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&self.time, "%H:%M:%S"))
            .ok()?;
        Some(date.and_time(time))
    }

    /// Moment the reminder becomes due (`scheduled_at − reminder`).
    #[must_use]
    pub fn reminder_due(&self) -> Option<NaiveDateTime> {
        let scheduled = self.scheduled_at()?;
        scheduled.checked_sub_signed(Duration::try_minutes(self.reminder)?)
    }

    /// Whether the reminder is still pending evaluation.
    #[must_use]
    pub fn awaits_reminder(&self) -> bool {
        !self.done && !self.reminder_fired
    }
}

/// Fields supplied when creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSpec {
    pub title: String,
    pub date: String,
    pub time: String,
    pub reminder: i64,
    pub color: String,
}

impl Default for TaskSpec {
    fn default() -> Self {
        Self {
            title: String::new(),
            date: String::new(),
            time: String::new(),
            reminder: DEFAULT_REMINDER_MINUTES,
            color: default_color(),
        }
    }
}

/// Partial task update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub reminder: Option<i64>,
    pub done: Option<bool>,
    pub color: Option<String>,
    /// Explicitly re-arm (or set) the reminder latch.
    pub reminder_fired: Option<bool>,
}
