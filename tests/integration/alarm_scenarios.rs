//! Alarm ticker scenarios driven through an injected clock.

use crate::helpers::{at, fixed_clock, temp_store};
use chronos::AlarmScheduler;
use chronos::audio::catalog::{DEFAULT_SOUND, SoundCatalog};
use chronos::audio::dispatch::SoundDispatcher;
use chronos::audio::playback::{Clip, PlaybackBackend};
use chronos::scheduler::{AlarmPatch, AlarmSpec, Weekday};
use std::sync::{Arc, OnceLock, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn wake_up() -> AlarmSpec {
    AlarmSpec {
        time: "07:00".into(),
        label: "Wake up".into(),
        ..AlarmSpec::default()
    }
}

#[test]
fn rings_once_at_seven_and_dismiss_keeps_it_active() {
    let (_dir, store) = temp_store();
    let (clock, dyn_clock) = fixed_clock("2024-01-01T06:59:59");
    let rings = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&rings);
    let alarms = AlarmScheduler::new(store)
        .with_clock(dyn_clock)
        .with_ring_callback(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
    let alarm = alarms.create(wake_up()).unwrap();

    assert!(alarms.tick().is_empty());
    clock.set(at("2024-01-01T07:00:00"));
    assert_eq!(alarms.tick(), vec![alarm.id.clone()]);
    // Re-entry within the same second.
    assert!(alarms.tick().is_empty());
    assert_eq!(rings.load(Ordering::SeqCst), 1);

    let dismissed = alarms.dismiss(&alarm.id).unwrap().unwrap();
    assert!(!dismissed.ringing);
    assert!(dismissed.active);

    // Still the same calendar minute: no second ring.
    assert!(alarms.tick().is_empty());
    assert_eq!(rings.load(Ordering::SeqCst), 1);
}

#[test]
fn non_repeating_alarm_rings_again_next_day() {
    let (_dir, store) = temp_store();
    let alarms = AlarmScheduler::new(store);
    let alarm = alarms.create(wake_up()).unwrap();

    assert_eq!(alarms.evaluate_at(at("2024-01-01T07:00:00")).len(), 1);
    alarms.dismiss(&alarm.id).unwrap();
    assert_eq!(alarms.evaluate_at(at("2024-01-02T07:00:00")).len(), 1);
}

#[test]
fn weekday_repeat_limits_firing_days() {
    let (_dir, store) = temp_store();
    let alarms = AlarmScheduler::new(store);
    let weekend = alarms
        .create(AlarmSpec {
            repeat: vec![Weekday::Sat, Weekday::Sun],
            ..wake_up()
        })
        .unwrap();

    // 2024-01-05 was a Friday, 2024-01-06 a Saturday.
    assert!(alarms.evaluate_at(at("2024-01-05T07:00:00")).is_empty());
    assert_eq!(alarms.evaluate_at(at("2024-01-06T07:00:00")), vec![weekend.id]);
}

#[test]
fn ringing_alarm_is_not_refired_until_dismissed() {
    let (_dir, store) = temp_store();
    let alarms = AlarmScheduler::new(store);
    let alarm = alarms.create(wake_up()).unwrap();

    assert_eq!(alarms.evaluate_at(at("2024-01-01T07:00:00")).len(), 1);
    // Still ringing the next day: skipped.
    assert!(alarms.evaluate_at(at("2024-01-02T07:00:00")).is_empty());
    alarms.dismiss(&alarm.id).unwrap();
    assert_eq!(alarms.evaluate_at(at("2024-01-03T07:00:00")).len(), 1);
}

#[test]
fn deactivated_alarm_stays_stored_but_silent() {
    let (_dir, store) = temp_store();
    let alarms = AlarmScheduler::new(Arc::clone(&store));
    let alarm = alarms.create(wake_up()).unwrap();
    alarms
        .update(&alarm.id, AlarmPatch {
            active: Some(false),
            ..AlarmPatch::default()
        })
        .unwrap();

    assert!(alarms.evaluate_at(at("2024-01-01T07:00:00")).is_empty());
    assert_eq!(store.load_alarms().len(), 1);
}

#[test]
fn delete_nonexistent_leaves_collection_and_file_unchanged() {
    let (_dir, store) = temp_store();
    let alarms = AlarmScheduler::new(Arc::clone(&store));
    alarms.create(wake_up()).unwrap();
    let before_file = std::fs::read(store.alarms_path()).unwrap();
    let before_list = alarms.list();

    assert!(!alarms.delete("no-such-alarm").unwrap());
    assert!(alarms.dismiss("no-such-alarm").unwrap().is_none());
    assert_eq!(alarms.list(), before_list);
    assert_eq!(std::fs::read(store.alarms_path()).unwrap(), before_file);
}

#[test]
fn restart_forgets_ringing_state() {
    let (_dir, store) = temp_store();
    let alarm = {
        let alarms = AlarmScheduler::new(Arc::clone(&store));
        let alarm = alarms.create(wake_up()).unwrap();
        alarms.evaluate_at(at("2024-01-01T07:00:00"));
        assert!(alarms.get(&alarm.id).unwrap().ringing);
        alarm
    };

    let reopened = AlarmScheduler::new(store);
    let reloaded = reopened.get(&alarm.id).unwrap();
    assert!(!reloaded.ringing);
    assert_eq!(reloaded.label, "Wake up");
}

struct CountingBackend(Arc<AtomicUsize>);

impl PlaybackBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }
    fn is_available(&self) -> bool {
        true
    }
    fn play(&self, _clip: &Clip) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn fire_loops_sound_until_dismissed() {
    let (dir, store) = temp_store();
    let plays = Arc::new(AtomicUsize::new(0));
    let catalog = Arc::new(SoundCatalog::new(
        dir.path(),
        dir.path().join("builtin"),
        DEFAULT_SOUND,
    ));
    let dispatcher = Arc::new(SoundDispatcher::with_backends(
        catalog,
        8_000,
        vec![Box::new(CountingBackend(Arc::clone(&plays)))],
    ));
    let alarms = AlarmScheduler::new(store).with_playback(dispatcher);
    let alarm = alarms
        .create(AlarmSpec {
            sound: "Digital Pulse".into(),
            ..wake_up()
        })
        .unwrap();

    alarms.evaluate_at(at("2024-01-01T07:00:00"));
    assert!(alarms.is_playing(&alarm.id));

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while plays.load(Ordering::SeqCst) < 2 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(plays.load(Ordering::SeqCst) >= 2, "sound should loop");

    alarms.dismiss(&alarm.id).unwrap();
    assert!(!alarms.is_playing(&alarm.id));
    std::thread::sleep(Duration::from_millis(200));
    let settled = plays.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(plays.load(Ordering::SeqCst), settled);
}

fn counting_dispatcher(dir: &std::path::Path, plays: &Arc<AtomicUsize>) -> Arc<SoundDispatcher> {
    let catalog = Arc::new(SoundCatalog::new(dir, dir.join("builtin"), DEFAULT_SOUND));
    Arc::new(SoundDispatcher::with_backends(
        catalog,
        8_000,
        vec![Box::new(CountingBackend(Arc::clone(plays)))],
    ))
}

/// Scheduler whose ring callback runs `on_ring` against the scheduler itself.
fn self_handling_scheduler(
    dir: &std::path::Path,
    store: Arc<chronos::Store>,
    plays: &Arc<AtomicUsize>,
    on_ring: fn(&AlarmScheduler, &str),
) -> Arc<AlarmScheduler> {
    let handle: Arc<OnceLock<Weak<AlarmScheduler>>> = Arc::new(OnceLock::new());
    let callback_handle = Arc::clone(&handle);
    let alarms = Arc::new(
        AlarmScheduler::new(store)
            .with_playback(counting_dispatcher(dir, plays))
            .with_ring_callback(Arc::new(move |id| {
                if let Some(alarms) = callback_handle.get().and_then(Weak::upgrade) {
                    on_ring(&alarms, id);
                }
                Ok(())
            })),
    );
    handle.set(Arc::downgrade(&alarms)).unwrap();
    alarms
}

#[test]
fn dismiss_from_ring_callback_leaves_no_sound_running() {
    let (dir, store) = temp_store();
    let plays = Arc::new(AtomicUsize::new(0));
    let alarms = self_handling_scheduler(dir.path(), store, &plays, |alarms, id| {
        alarms.dismiss(id).unwrap();
    });
    let alarm = alarms.create(wake_up()).unwrap();

    assert_eq!(alarms.evaluate_at(at("2024-01-01T07:00:00")), vec![alarm.id.clone()]);
    assert!(!alarms.get(&alarm.id).unwrap().ringing);
    assert!(!alarms.is_playing(&alarm.id));

    std::thread::sleep(Duration::from_millis(300));
    let settled = plays.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(plays.load(Ordering::SeqCst), settled);
}

#[test]
fn delete_from_ring_callback_leaves_no_sound_running() {
    let (dir, store) = temp_store();
    let plays = Arc::new(AtomicUsize::new(0));
    let alarms = self_handling_scheduler(dir.path(), store, &plays, |alarms, id| {
        assert!(alarms.delete(id).unwrap());
    });
    let alarm = alarms.create(wake_up()).unwrap();

    alarms.evaluate_at(at("2024-01-01T07:00:00"));
    assert!(alarms.get(&alarm.id).is_none());
    assert!(!alarms.is_playing(&alarm.id));

    std::thread::sleep(Duration::from_millis(300));
    let settled = plays.load(Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(plays.load(Ordering::SeqCst), settled);
}

#[tokio::test]
async fn background_ticker_rings_once_per_minute() {
    let (_dir, store) = temp_store();
    // Frozen at second 0: every tick re-enters the same minute.
    let (_clock, dyn_clock) = fixed_clock("2024-01-01T07:00:00");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let alarms = Arc::new(
        AlarmScheduler::new(store)
            .with_clock(dyn_clock)
            .with_ring_callback(Arc::new(move |id| {
                tx.send(id.to_owned())?;
                Ok(())
            })),
    );
    let alarm = alarms.create(wake_up()).unwrap();

    alarms.start().unwrap();
    let first = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("ticker should ring within a few seconds");
    assert_eq!(first, Some(alarm.id.clone()));

    alarms.dismiss(&alarm.id).unwrap();
    let again = tokio::time::timeout(Duration::from_millis(2_500), rx.recv()).await;
    assert!(again.is_err(), "same minute must not ring twice");

    alarms.stop();
    alarms.shutdown().await;
    assert!(!alarms.is_running());
}
