//! Persistence across scheduler restarts and damaged state files.

use crate::helpers::temp_store;
use chronos::scheduler::{AlarmSpec, TaskSpec, Weekday};
use chronos::{AlarmScheduler, Store, TaskScheduler};
use std::sync::Arc;

#[test]
fn collections_round_trip_through_restart() {
    let (_dir, store) = temp_store();
    let (alarms_before, tasks_before) = {
        let alarms = AlarmScheduler::new(Arc::clone(&store));
        let tasks = TaskScheduler::new(Arc::clone(&store));
        alarms
            .create(AlarmSpec {
                time: "06:30".into(),
                label: "Run".into(),
                sound: "Gentle Bell".into(),
                repeat: vec![Weekday::Mon, Weekday::Wed, Weekday::Fri],
                active: true,
            })
            .unwrap();
        alarms
            .create(AlarmSpec {
                time: "22:15".into(),
                active: false,
                ..AlarmSpec::default()
            })
            .unwrap();
        tasks
            .create(TaskSpec {
                title: "Dentist".into(),
                date: "2024-03-04".into(),
                time: "14:30".into(),
                reminder: 45,
                color: "#ef4444".into(),
            })
            .unwrap();
        (alarms.list(), tasks.list())
    };

    assert_eq!(AlarmScheduler::new(Arc::clone(&store)).list(), alarms_before);
    assert_eq!(TaskScheduler::new(store).list(), tasks_before);
}

#[test]
fn stale_temp_file_from_interrupted_save_is_ignored() {
    let (dir, store) = temp_store();
    let alarms = AlarmScheduler::new(Arc::clone(&store));
    let kept = alarms
        .create(AlarmSpec {
            time: "08:00".into(),
            ..AlarmSpec::default()
        })
        .unwrap();
    let committed = std::fs::read(store.alarms_path()).unwrap();

    // A crash after writing the temp sibling but before the rename.
    std::fs::write(dir.path().join("alarms.json.tmp"), br#"{"alarms": [{"id": "#).unwrap();

    assert_eq!(std::fs::read(store.alarms_path()).unwrap(), committed);
    let reopened = AlarmScheduler::new(Arc::clone(&store));
    assert_eq!(reopened.list(), vec![kept]);

    // The next save replaces the stale temp file and commits normally.
    reopened
        .create(AlarmSpec {
            time: "09:00".into(),
            ..AlarmSpec::default()
        })
        .unwrap();
    assert_eq!(store.load_alarms().len(), 2);
    assert!(!dir.path().join("alarms.json.tmp").exists());
}

#[test]
fn corrupt_documents_load_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alarms.json"), b"{not json").unwrap();
    std::fs::write(dir.path().join("tasks.json"), br#"{"tasks": "nope"}"#).unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());

    assert!(AlarmScheduler::new(Arc::clone(&store)).list().is_empty());
    assert!(TaskScheduler::new(store).list().is_empty());
}

#[test]
fn malformed_rows_are_skipped_and_ringing_reset() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("alarms.json"),
        br#"{"alarms": [
            {"id": "a1", "time": "07:00", "ringing": true},
            {"id": 42},
            {"id": "a2", "time": "07:30", "repeat": ["Sat"]}
        ]}"#,
    )
    .unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());

    let alarms = AlarmScheduler::new(store).list();
    assert_eq!(alarms.len(), 2);
    assert!(alarms.iter().all(|a| !a.ringing));
    assert_eq!(alarms[1].repeat, vec![Weekday::Sat]);
}

#[test]
fn documents_use_wrapped_array_shape() {
    let (_dir, store) = temp_store();
    TaskScheduler::new(Arc::clone(&store))
        .create(TaskSpec {
            title: "Pay rent".into(),
            ..TaskSpec::default()
        })
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(store.tasks_path()).unwrap()).unwrap();
    let row = &raw["tasks"][0];
    assert_eq!(row["title"], "Pay rent");
    assert_eq!(row["reminder"], 10);
    assert_eq!(row["color"], "#6366f1");
    assert_eq!(row["reminder_fired"], false);
    assert_eq!(row["done"], false);
}
