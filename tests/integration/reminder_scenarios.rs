//! Task reminder window and latch scenarios.

use crate::helpers::{at, fixed_clock, temp_store};
use chronos::TaskScheduler;
use chronos::platform::DesktopNotifier;
use chronos::scheduler::{TaskPatch, TaskSpec};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn standup() -> TaskSpec {
    TaskSpec {
        title: "Standup".into(),
        date: "2024-01-01".into(),
        time: "10:00".into(),
        reminder: 10,
        ..TaskSpec::default()
    }
}

/// Fire check for a fresh task evaluated once at `now`.
fn fires_at(now: &str) -> bool {
    let (_dir, store) = temp_store();
    let tasks = TaskScheduler::new(store);
    tasks.create(standup()).unwrap();
    !tasks.evaluate_at(at(now)).is_empty()
}

#[test]
fn window_edges() {
    assert!(fires_at("2024-01-01T09:50:00"), "delta 0 fires");
    assert!(fires_at("2024-01-01T09:50:30"), "delta 30 fires");
    assert!(!fires_at("2024-01-01T09:50:30.010"), "delta 30.01 does not");
    assert!(!fires_at("2024-01-01T09:49:59.990"), "delta -0.01 does not");
}

#[test]
fn fires_at_nine_fifty_and_not_again() {
    let (_dir, store) = temp_store();
    let tasks = TaskScheduler::new(Arc::clone(&store));
    let task = tasks.create(standup()).unwrap();

    assert_eq!(tasks.evaluate_at(at("2024-01-01T09:50:00")), vec![task.id.clone()]);
    assert!(tasks.evaluate_at(at("2024-01-01T09:50:15")).is_empty());

    let persisted = store.load_tasks();
    assert_eq!(persisted.len(), 1);
    assert!(persisted[0].reminder_fired);
}

#[test]
fn latch_survives_restart_and_many_passes() {
    let (_dir, store) = temp_store();
    let task = {
        let tasks = TaskScheduler::new(Arc::clone(&store));
        let task = tasks.create(standup()).unwrap();
        tasks.evaluate_at(at("2024-01-01T09:50:00"));
        task
    };

    let reopened = TaskScheduler::new(store);
    for second in 0..=30 {
        let now = at("2024-01-01T09:50:00") + chrono::Duration::seconds(second);
        assert!(reopened.evaluate_at(now).is_empty());
    }
    assert!(reopened.get(&task.id).unwrap().reminder_fired);
}

#[test]
fn rescheduling_without_rearming_stays_silent() {
    let (_dir, store) = temp_store();
    let tasks = TaskScheduler::new(store);
    let task = tasks.create(standup()).unwrap();
    tasks.evaluate_at(at("2024-01-01T09:50:00"));

    tasks
        .update(&task.id, TaskPatch {
            time: Some("11:00".into()),
            ..TaskPatch::default()
        })
        .unwrap();
    assert!(tasks.evaluate_at(at("2024-01-01T10:50:00")).is_empty());

    tasks
        .update(&task.id, TaskPatch {
            reminder_fired: Some(false),
            ..TaskPatch::default()
        })
        .unwrap();
    assert_eq!(tasks.evaluate_at(at("2024-01-01T10:50:00")).len(), 1);
}

#[test]
fn tasks_missing_schedule_are_never_eligible() {
    let (_dir, store) = temp_store();
    let tasks = TaskScheduler::new(store);
    tasks
        .create(TaskSpec {
            date: String::new(),
            ..standup()
        })
        .unwrap();
    tasks
        .create(TaskSpec {
            time: "soon".into(),
            ..standup()
        })
        .unwrap();
    assert!(tasks.evaluate_at(at("2024-01-01T09:50:00")).is_empty());
}

struct FailingNotifier {
    attempts: Mutex<usize>,
}

impl DesktopNotifier for FailingNotifier {
    fn name(&self) -> &'static str {
        "failing"
    }
    fn is_available(&self) -> bool {
        true
    }
    fn notify(&self, _title: &str, _body: &str) -> anyhow::Result<()> {
        *self.attempts.lock().unwrap() += 1;
        anyhow::bail!("notification daemon not running")
    }
}

#[test]
fn notifier_failure_does_not_block_callback() {
    let (_dir, store) = temp_store();
    let notifier = Arc::new(FailingNotifier {
        attempts: Mutex::new(0),
    });
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let tasks = TaskScheduler::new(store)
        .with_notifier(Arc::clone(&notifier) as Arc<dyn DesktopNotifier>)
        .with_reminder_callback(Arc::new(move |id| {
            sink.lock().unwrap().push(id.to_owned());
            Ok(())
        }));
    let task = tasks.create(standup()).unwrap();

    tasks.evaluate_at(at("2024-01-01T09:50:10"));
    assert_eq!(*notifier.attempts.lock().unwrap(), 1);
    assert_eq!(*seen.lock().unwrap(), vec![task.id]);
}

#[tokio::test]
async fn monitor_fires_as_clock_enters_window() {
    let (_dir, store) = temp_store();
    let (clock, dyn_clock) = fixed_clock("2024-01-01T09:45:00");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let tasks = Arc::new(
        TaskScheduler::new(store)
            .with_clock(dyn_clock)
            .with_poll_interval(Duration::from_millis(20))
            .with_reminder_callback(Arc::new(move |id| {
                tx.send(id.to_owned())?;
                Ok(())
            })),
    );
    let task = tasks.create(standup()).unwrap();
    tasks.start().unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err(), "too early to remind");

    clock.set(at("2024-01-01T09:50:05"));
    let fired = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("monitor should fire inside the window");
    assert_eq!(fired, Some(task.id));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err(), "latched reminder fires once");

    tasks.shutdown().await;
}
