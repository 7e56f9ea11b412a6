//! Alarm and task-reminder scheduling.
//!
//! Two independent evaluators share one shape: an owned, lock-protected
//! collection loaded from the [`Store`](crate::store::Store), CRUD methods
//! that persist synchronously, and a background worker that runs an
//! evaluation pass per period until cancelled.

pub mod alarms;
pub mod callback;
pub mod clock;
pub mod reminders;
pub mod types;
mod worker;

pub use alarms::AlarmScheduler;
pub use callback::{CallbackOutcome, FireCallback};
pub use clock::{Clock, FixedClock, SystemClock};
pub use reminders::{REMINDER_WINDOW_SECS, TaskScheduler};
pub use types::{Alarm, AlarmPatch, AlarmSpec, Task, TaskPatch, TaskSpec, Weekday};
