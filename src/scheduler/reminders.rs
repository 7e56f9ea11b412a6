//! Task scheduler: owns the task collection and sends lead-time reminders.
//!
//! Every poll the monitor computes, for each pending task,
//! `delta = now − (date + time − reminder)` and fires when
//! `0 ≤ delta ≤ 30 s`. Firing sets the persisted `reminder_fired` latch,
//! saves the collection, shows a best-effort desktop notification, then
//! invokes the reminder callback. The latch is only ever cleared by an
//! explicit update.

use crate::error::Result;
use crate::platform::{DesktopNotifier, NoopNotifier, notify_best_effort};
use crate::scheduler::callback::{self, FireCallback};
use crate::scheduler::clock::{Clock, SystemClock};
use crate::scheduler::types::{Task, TaskPatch, TaskSpec};
use crate::scheduler::worker::{self, Worker};
use crate::store::Store;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Width of the reminder fire window, in seconds.
pub const REMINDER_WINDOW_SECS: i64 = 30;

/// Default monitor period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Whether a reminder due at `due` fires at `now`.
///
/// Compared at millisecond resolution, so 30.001 s late is outside the window.
#[must_use]
pub fn within_window(due: NaiveDateTime, now: NaiveDateTime) -> bool {
    let delta_ms = (now - due).num_milliseconds();
    (0..=REMINDER_WINDOW_SECS * 1_000).contains(&delta_ms)
}

/// Title and body of the desktop notification for `task`.
#[must_use]
pub fn reminder_message(task: &Task) -> (String, String) {
    (
        format!("Reminder: {}", task.title),
        format!("Starting in {} min • {}", task.reminder, task.time),
    )
}

/// Owns the task collection and its reminder monitor.
pub struct TaskScheduler {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    tasks: Mutex<BTreeMap<String, Task>>,
    persist_lock: Mutex<()>,
    notifier: Arc<dyn DesktopNotifier>,
    on_reminder: Option<FireCallback>,
    poll_interval: Duration,
    worker: Mutex<Option<Worker>>,
}

impl TaskScheduler {
    /// Scheduler over the tasks persisted in `store`.
    ///
    /// Desktop notifications are off until [`with_notifier`](Self::with_notifier).
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        let tasks = store
            .load_tasks()
            .into_iter()
            .map(|task| (task.id.clone(), task))
            .collect::<BTreeMap<_, _>>();
        debug!("loaded {} tasks", tasks.len());

        Self {
            store,
            clock: Arc::new(SystemClock),
            tasks: Mutex::new(tasks),
            persist_lock: Mutex::new(()),
            notifier: Arc::new(NoopNotifier),
            on_reminder: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            worker: Mutex::new(None),
        }
    }

    /// Use `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Show reminders through `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn DesktopNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Callback invoked with the task id after each reminder is latched and saved.
    #[must_use]
    pub fn with_reminder_callback(mut self, callback: FireCallback) -> Self {
        self.on_reminder = Some(callback);
        self
    }

    /// Override the monitor period.
    ///
    /// The fire window stays [`REMINDER_WINDOW_SECS`] wide; periods longer
    /// than that can skip reminders.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        if interval > Duration::from_secs(REMINDER_WINDOW_SECS as u64) {
            warn!(
                poll_secs = interval.as_secs(),
                "poll interval exceeds the reminder window; reminders may be missed"
            );
        }
        self.poll_interval = interval.max(Duration::from_millis(10));
        self
    }

    fn tasks(&self) -> MutexGuard<'_, BTreeMap<String, Task>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All tasks, ordered by id.
    #[must_use]
    pub fn list(&self) -> Vec<Task> {
        self.tasks().values().cloned().collect()
    }

    /// The task with `id`, if any.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Task> {
        self.tasks().get(id).cloned()
    }

    /// Create and persist a new task.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be saved; the task
    /// stays in memory and is written by the next successful save.
    pub fn create(&self, spec: TaskSpec) -> Result<Task> {
        let task = Task::from_spec(spec);
        self.tasks().insert(task.id.clone(), task.clone());
        info!(task_id = %task.id, title = %task.title, "task created");
        self.persist()?;
        Ok(task)
    }

    /// Apply `patch` to the task with `id`. Returns `None` for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be saved.
    pub fn update(&self, id: &str, patch: TaskPatch) -> Result<Option<Task>> {
        let updated = {
            let mut tasks = self.tasks();
            let Some(task) = tasks.get_mut(id) else {
                return Ok(None);
            };
            task.apply(patch);
            task.clone()
        };
        self.persist()?;
        Ok(Some(updated))
    }

    /// Delete the task with `id`. Returns `false` (and writes nothing) for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be saved.
    pub fn delete(&self, id: &str) -> Result<bool> {
        if self.tasks().remove(id).is_none() {
            return Ok(false);
        }
        info!(task_id = %id, "task deleted");
        self.persist()?;
        Ok(true)
    }

    /// Run one evaluation pass at the clock's current time.
    pub fn tick(&self) -> Vec<String> {
        self.evaluate_at(self.clock.now())
    }

    /// Run one evaluation pass as if the local time were `now`.
    ///
    /// Returns the ids of the tasks whose reminder fired.
    pub fn evaluate_at(&self, now: NaiveDateTime) -> Vec<String> {
        let candidates: Vec<Task> = self
            .tasks()
            .values()
            .filter(|task| task.awaits_reminder())
            .cloned()
            .collect();

        let mut fired = Vec::new();
        for task in candidates {
            let Some(due) = task.reminder_due() else {
                continue;
            };
            if !within_window(due, now) {
                continue;
            }
            if self.fire(&task.id) {
                fired.push(task.id);
            }
        }
        fired
    }

    /// Latch, persist, notify, call back. Returns `false` if another pass
    /// (or an update) got there first.
    fn fire(&self, id: &str) -> bool {
        let task = {
            let mut tasks = self.tasks();
            let Some(task) = tasks.get_mut(id) else {
                return false;
            };
            if !task.awaits_reminder() {
                return false;
            }
            task.reminder_fired = true;
            task.clone()
        };
        info!(task_id = %task.id, title = %task.title, "task reminder due");

        if let Err(e) = self.persist() {
            warn!(task_id = %task.id, "cannot persist reminder latch: {e}");
        }

        let (title, body) = reminder_message(&task);
        if !notify_best_effort(self.notifier.as_ref(), &title, &body) {
            debug!(task_id = %task.id, notifier = self.notifier.name(), "desktop notification skipped");
        }

        callback::invoke(self.on_reminder.as_ref(), "task", &task.id);
        true
    }

    /// Start the reminder monitor. The first pass runs immediately.
    /// Calling it while running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ChronosError::Scheduler`](crate::error::ChronosError::Scheduler)
    /// when called outside a tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        worker::start(&self.worker, "task", self.poll_interval, false, move || {
            match weak.upgrade() {
                Some(scheduler) => {
                    scheduler.tick();
                    true
                }
                None => false,
            }
        })
    }

    /// Signal the monitor to stop. Returns immediately.
    pub fn stop(&self) {
        worker::stop(&self.worker, "task");
    }

    /// Stop the monitor and wait for it to exit.
    pub async fn shutdown(&self) {
        worker::shutdown(&self.worker, "task").await;
    }

    /// Whether the monitor is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        worker::is_running(&self.worker)
    }

    fn persist(&self) -> Result<()> {
        let _order = self
            .persist_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.list();
        self.store.save_tasks(&snapshot)
    }
}
