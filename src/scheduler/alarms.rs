//! Alarm scheduler: owns the alarm collection and rings alarms on time.
//!
//! The background ticker wakes once per second and evaluates the collection
//! only when the wall clock reads second 0. A due alarm is flipped to
//! `ringing` under the collection lock; the ring callback runs afterwards,
//! outside the lock, and the snapshot is persisted last.
//!
//! Each alarm fires at most once per calendar minute: the minute it last
//! fired is remembered, so a pass that re-enters within the same minute
//! (or after an immediate dismiss) does not ring it again.

use crate::audio::dispatch::{LoopingPlayer, SoundDispatcher};
use crate::error::{ChronosError, Result};
use crate::scheduler::callback::{self, FireCallback};
use crate::scheduler::clock::{Clock, SystemClock};
use crate::scheduler::types::{Alarm, AlarmPatch, AlarmSpec};
use crate::scheduler::worker::{self, Worker};
use crate::store::Store;
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ticker period.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Default)]
struct AlarmState {
    alarms: BTreeMap<String, Alarm>,
    /// Minute (seconds zeroed) in which each alarm last fired.
    last_fired: HashMap<String, NaiveDateTime>,
}

/// Owns the alarm collection and its background ticker.
///
/// Share it behind an [`Arc`]; [`start`](Self::start) needs one so the
/// ticker can reach the collection.
pub struct AlarmScheduler {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    state: Mutex<AlarmState>,
    /// Serializes snapshot-and-write so saves land in mutation order.
    persist_lock: Mutex<()>,
    on_ring: Option<FireCallback>,
    playback: Option<Arc<SoundDispatcher>>,
    players: Mutex<HashMap<String, LoopingPlayer>>,
    worker: Mutex<Option<Worker>>,
}

impl AlarmScheduler {
    /// Scheduler over the alarms persisted in `store`.
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        let alarms = store
            .load_alarms()
            .into_iter()
            .map(|alarm| (alarm.id.clone(), alarm))
            .collect::<BTreeMap<_, _>>();
        debug!("loaded {} alarms", alarms.len());

        Self {
            store,
            clock: Arc::new(SystemClock),
            state: Mutex::new(AlarmState {
                alarms,
                last_fired: HashMap::new(),
            }),
            persist_lock: Mutex::new(()),
            on_ring: None,
            playback: None,
            players: Mutex::new(HashMap::new()),
            worker: Mutex::new(None),
        }
    }

    /// Use `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Callback invoked with the alarm id each time an alarm starts ringing.
    #[must_use]
    pub fn with_ring_callback(mut self, callback: FireCallback) -> Self {
        self.on_ring = Some(callback);
        self
    }

    /// Loop the alarm's sound locally while it rings.
    #[must_use]
    pub fn with_playback(mut self, dispatcher: Arc<SoundDispatcher>) -> Self {
        self.playback = Some(dispatcher);
        self
    }

    fn state(&self) -> MutexGuard<'_, AlarmState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All alarms, ordered by id.
    #[must_use]
    pub fn list(&self) -> Vec<Alarm> {
        self.state().alarms.values().cloned().collect()
    }

    /// The alarm with `id`, if any.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Alarm> {
        self.state().alarms.get(id).cloned()
    }

    /// Create and persist a new alarm.
    ///
    /// # Errors
    ///
    /// Returns [`ChronosError::Scheduler`] if `spec.time` is not a valid
    /// `HH:MM` time, or a storage error if the collection cannot be saved.
    /// On a storage error the alarm stays in memory and is written by the
    /// next successful save.
    pub fn create(&self, spec: AlarmSpec) -> Result<Alarm> {
        let mut spec = spec;
        spec.time = normalize_time(&spec.time)?;
        let alarm = Alarm::from_spec(spec);
        self.state()
            .alarms
            .insert(alarm.id.clone(), alarm.clone());
        info!(alarm_id = %alarm.id, time = %alarm.time, "alarm created");
        self.persist()?;
        Ok(alarm)
    }

    /// Apply `patch` to the alarm with `id`. Returns `None` for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns [`ChronosError::Scheduler`] for an invalid time, or a storage
    /// error if the collection cannot be saved.
    pub fn update(&self, id: &str, patch: AlarmPatch) -> Result<Option<Alarm>> {
        let mut patch = patch;
        if let Some(time) = patch.time.as_deref() {
            patch.time = Some(normalize_time(time)?);
        }
        let stops_ringing = patch.ringing == Some(false) || patch.active == Some(false);

        let updated = {
            let mut state = self.state();
            let Some(alarm) = state.alarms.get_mut(id) else {
                return Ok(None);
            };
            alarm.apply(patch);
            alarm.clone()
        };
        if stops_ringing {
            self.stop_player(id);
        }
        self.persist()?;
        Ok(Some(updated))
    }

    /// Delete the alarm with `id`. Returns `false` (and writes nothing) for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be saved.
    pub fn delete(&self, id: &str) -> Result<bool> {
        {
            let mut state = self.state();
            if state.alarms.remove(id).is_none() {
                return Ok(false);
            }
            state.last_fired.remove(id);
        }
        self.stop_player(id);
        info!(alarm_id = %id, "alarm deleted");
        self.persist()?;
        Ok(true)
    }

    /// Stop a ringing alarm. The alarm stays active.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the collection cannot be saved.
    pub fn dismiss(&self, id: &str) -> Result<Option<Alarm>> {
        let dismissed = self.update(id, AlarmPatch {
            ringing: Some(false),
            ..AlarmPatch::default()
        })?;
        if dismissed.is_some() {
            info!(alarm_id = %id, "alarm dismissed");
        }
        Ok(dismissed)
    }

    /// Play the alarm's sound once in the background.
    ///
    /// Returns the sound name, or `None` for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns [`ChronosError::Audio`] if local playback is not configured or
    /// the preview thread cannot be spawned.
    pub fn preview(&self, id: &str) -> Result<Option<String>> {
        let Some(alarm) = self.get(id) else {
            return Ok(None);
        };
        let Some(dispatcher) = self.playback.clone() else {
            return Err(ChronosError::Audio("local playback is disabled".into()));
        };
        let sound = alarm.sound.clone();
        std::thread::Builder::new()
            .name("chronos-preview".into())
            .spawn(move || {
                dispatcher.play_once(&sound);
            })
            .map_err(|e| ChronosError::Audio(format!("cannot spawn preview thread: {e}")))?;
        Ok(Some(alarm.sound))
    }

    /// Run one evaluation pass at the clock's current time.
    pub fn tick(&self) -> Vec<String> {
        self.evaluate_at(self.clock.now())
    }

    /// Run one evaluation pass as if the local time were `now`.
    ///
    /// Only a pass at second 0 scans the collection. Returns the ids of the
    /// alarms that fired, in id order.
    pub fn evaluate_at(&self, now: NaiveDateTime) -> Vec<String> {
        if now.second() != 0 {
            return Vec::new();
        }
        let minute = now.with_nanosecond(0).unwrap_or(now);

        let mut fired = Vec::new();
        {
            let mut guard = self.state();
            let AlarmState { alarms, last_fired } = &mut *guard;
            for alarm in alarms.values_mut() {
                if !alarm.is_due_at(&now) || last_fired.get(&alarm.id) == Some(&minute) {
                    continue;
                }
                alarm.ringing = true;
                last_fired.insert(alarm.id.clone(), minute);
                fired.push(alarm.clone());
            }
        }

        if fired.is_empty() {
            return Vec::new();
        }

        for alarm in &fired {
            info!(alarm_id = %alarm.id, time = %alarm.time, label = %alarm.label, "alarm ringing");
            self.start_player(alarm);
            callback::invoke(self.on_ring.as_ref(), "alarm", &alarm.id);
        }

        if let Err(e) = self.persist() {
            warn!("cannot persist alarms after firing: {e}");
        }
        fired.into_iter().map(|alarm| alarm.id).collect()
    }

    /// Start the background ticker. Calling it while running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ChronosError::Scheduler`] when called outside a tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        worker::start(&self.worker, "alarm", TICK_INTERVAL, true, move || {
            match weak.upgrade() {
                Some(scheduler) => {
                    scheduler.tick();
                    true
                }
                None => false,
            }
        })
    }

    /// Signal the ticker to stop. Returns immediately.
    pub fn stop(&self) {
        worker::stop(&self.worker, "alarm");
    }

    /// Stop the ticker and wait for it to exit. Also stops any looping sound.
    pub async fn shutdown(&self) {
        worker::shutdown(&self.worker, "alarm").await;
        let players: Vec<LoopingPlayer> = self
            .players
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, player)| player)
            .collect();
        drop(players);
    }

    /// Whether the ticker is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        worker::is_running(&self.worker)
    }

    /// Whether a looping sound is playing for `id`.
    #[must_use]
    pub fn is_playing(&self, id: &str) -> bool {
        self.players
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .is_some_and(LoopingPlayer::is_running)
    }

    /// Start the looping sound for `alarm` if it is still ringing.
    ///
    /// The check and the insert happen under the state lock, so a concurrent
    /// `dismiss`, `update` or `delete` either sees the player and stops it, or
    /// is seen here and no player is registered.
    fn start_player(&self, alarm: &Alarm) {
        let Some(dispatcher) = self.playback.as_ref() else {
            return;
        };
        let state = self.state();
        if !state.alarms.get(&alarm.id).is_some_and(|a| a.ringing) {
            debug!(alarm_id = %alarm.id, "alarm no longer ringing, sound not started");
            return;
        }
        match LoopingPlayer::start(Arc::clone(dispatcher), &alarm.sound) {
            Ok(player) => {
                // Replacing an old player drops, and so stops, it.
                self.players
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(alarm.id.clone(), player);
            }
            Err(e) => warn!(alarm_id = %alarm.id, "cannot start alarm sound: {e}"),
        }
        drop(state);
    }

    fn stop_player(&self, id: &str) {
        let player = self
            .players
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if let Some(mut player) = player {
            player.stop();
            debug!(alarm_id = %id, "alarm sound stopped");
        }
    }

    fn persist(&self) -> Result<()> {
        let _order = self
            .persist_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.list();
        self.store.save_alarms(&snapshot)
    }
}

/// Parse `HH:MM` (or `H:MM`) and re-render it zero-padded.
fn normalize_time(time: &str) -> Result<String> {
    NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| ChronosError::Scheduler(format!("invalid alarm time '{time}', expected HH:MM")))
}
