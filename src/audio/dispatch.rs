//! Sound dispatch through the playback fallback chain.
//!
//! [`SoundDispatcher`] resolves a sound name against the [`SoundCatalog`],
//! turns it into a [`Clip`] and offers it to each [`PlaybackBackend`] in
//! order. A backend that does not support the clip, reports itself
//! unavailable, or fails is skipped; the next one gets its turn.
//!
//! [`LoopingPlayer`] repeats a sound on a background thread until stopped.

use crate::audio::catalog::{SoundCatalog, SoundSource};
use crate::audio::external::{ExternalPlayer, TerminalBell};
use crate::audio::playback::{Clip, CpalDefaultPlayback, CpalPlayback, PlaybackBackend};
use crate::audio::synth::synthesize;
use crate::config::ChronosConfig;
use crate::error::{ChronosError, Result};
use crate::platform::HostOs;
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How a single play request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// A backend played the clip.
    Played { backend: &'static str },
    /// Every backend was skipped or failed.
    Silent,
}

/// Plays named sounds through an ordered list of backends.
pub struct SoundDispatcher {
    catalog: Arc<SoundCatalog>,
    backends: Vec<Box<dyn PlaybackBackend>>,
    sample_rate: u32,
}

impl SoundDispatcher {
    /// Dispatcher with the standard chain: cpal on the configured device,
    /// cpal on the default device, an external player, the terminal bell.
    #[must_use]
    pub fn new(catalog: Arc<SoundCatalog>, sample_rate: u32, output_device: Option<String>) -> Self {
        let backends: Vec<Box<dyn PlaybackBackend>> = vec![
            Box::new(CpalPlayback::new(output_device)),
            Box::new(CpalDefaultPlayback),
            Box::new(ExternalPlayer::new(HostOs::current())),
            Box::new(TerminalBell),
        ];
        Self::with_backends(catalog, sample_rate, backends)
    }

    /// Dispatcher laid out according to `config`.
    #[must_use]
    pub fn from_config(config: &ChronosConfig) -> Self {
        Self::new(
            Arc::new(SoundCatalog::from_config(config)),
            config.sound.sample_rate,
            config.sound.output_device.clone(),
        )
    }

    /// Dispatcher with an explicit backend chain.
    #[must_use]
    pub fn with_backends(
        catalog: Arc<SoundCatalog>,
        sample_rate: u32,
        backends: Vec<Box<dyn PlaybackBackend>>,
    ) -> Self {
        Self {
            catalog,
            backends,
            sample_rate,
        }
    }

    /// The catalog sounds are resolved against.
    #[must_use]
    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    /// Backend names in fallback order.
    #[must_use]
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Resolve `name` to a playable clip.
    #[must_use]
    pub fn clip_for(&self, name: &str) -> Clip {
        match self.catalog.resolve(name) {
            SoundSource::Synth(profile) => Clip::Tone {
                samples: synthesize(&profile, self.sample_rate),
                sample_rate: self.sample_rate,
            },
            SoundSource::File(path) => Clip::File(path),
            SoundSource::Bell => Clip::Bell,
        }
    }

    /// Clips to try for `name`, best first.
    ///
    /// A file sound named like a built-in profile is followed by that
    /// profile's tone, so a file no player can handle still sounds right.
    #[must_use]
    pub fn clips_for(&self, name: &str) -> Vec<Clip> {
        let primary = self.clip_for(name);
        let fallback = match (&primary, self.catalog.profile_for(name)) {
            (Clip::File(_), Some(profile)) => Some(Clip::Tone {
                samples: synthesize(&profile, self.sample_rate),
                sample_rate: self.sample_rate,
            }),
            _ => None,
        };
        std::iter::once(primary).chain(fallback).collect()
    }

    /// Play `name` once, blocking until it finishes.
    pub fn play_once(&self, name: &str) -> PlaybackOutcome {
        let outcome = self.play_clips(&self.clips_for(name));
        if outcome == PlaybackOutcome::Silent {
            warn!(sound = name, "no playback backend could play sound");
        }
        outcome
    }

    /// Offer `clip` to each backend in turn.
    pub fn play_clip(&self, clip: &Clip) -> PlaybackOutcome {
        self.play_clips(std::slice::from_ref(clip))
    }

    /// Offer each clip in turn to the chain. Last-resort backends only see
    /// the final clip.
    pub fn play_clips(&self, clips: &[Clip]) -> PlaybackOutcome {
        for (i, clip) in clips.iter().enumerate() {
            let last_clip = i + 1 == clips.len();
            for backend in &self.backends {
                if !backend.supports(clip) || (backend.is_last_resort() && !last_clip) {
                    continue;
                }
                if !backend.is_available() {
                    debug!(backend = backend.name(), "playback backend unavailable");
                    continue;
                }
                match backend.play(clip) {
                    Ok(()) => {
                        return PlaybackOutcome::Played {
                            backend: backend.name(),
                        };
                    }
                    Err(e) => debug!(backend = backend.name(), "playback failed: {e}"),
                }
            }
        }
        PlaybackOutcome::Silent
    }
}

/// Repeats one sound on a background thread until stopped.
///
/// Between plays the thread waits for the sound's pause, or for the stop
/// signal, whichever comes first. A stop requested mid-play takes effect
/// at the next pause.
pub struct LoopingPlayer {
    sound: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl LoopingPlayer {
    /// Start looping `sound`.
    ///
    /// # Errors
    ///
    /// Returns [`ChronosError::Audio`] if the playback thread cannot be spawned.
    pub fn start(dispatcher: Arc<SoundDispatcher>, sound: &str) -> Result<Self> {
        let clips = dispatcher.clips_for(sound);
        let pause = dispatcher.catalog().pause_for(sound);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let thread_sound = sound.to_owned();
        let handle = std::thread::Builder::new()
            .name(format!("chronos-loop-{sound}"))
            .spawn(move || {
                loop {
                    if dispatcher.play_clips(&clips) == PlaybackOutcome::Silent {
                        debug!(sound = %thread_sound, "loop iteration was silent");
                    }
                    match stop_rx.recv_timeout(pause) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!(sound = %thread_sound, "looping player stopped");
            })
            .map_err(|e| ChronosError::Audio(format!("cannot spawn playback thread: {e}")))?;

        info!(sound, "looping player started");
        Ok(Self {
            sound: sound.to_owned(),
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Sound being looped.
    #[must_use]
    pub fn sound(&self) -> &str {
        &self.sound
    }

    /// Signal the loop to stop. Returns immediately.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
    }

    /// Stop and wait up to `timeout` for the thread to exit.
    ///
    /// Returns `true` if the thread finished in time.
    pub fn stop_and_join(mut self, timeout: Duration) -> bool {
        self.stop();
        let Some(handle) = self.handle.take() else {
            return true;
        };
        let deadline = std::time::Instant::now() + timeout;
        while !handle.is_finished() {
            if std::time::Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        handle.join().is_ok()
    }

    /// Whether the loop thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for LoopingPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
