//! Waveform synthesis for built-in sound profiles.
//!
//! Deterministic and stateless: a [`SoundProfile`] and a sample rate always
//! produce the same mono `f32` buffer.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Output gain applied to every synthesized sample.
const GAIN: f32 = 0.7;

/// Linear fade-in length in seconds.
const ATTACK_SECS: f32 = 0.01;

/// Linear fade-out length in seconds.
const RELEASE_SECS: f32 = 0.05;

/// Oscillator shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Parameters of one synthesized sound burst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundProfile {
    pub waveform: Waveform,
    /// Frequency at the start of the burst (Hz).
    pub freq_start: f32,
    /// Frequency at the end of the burst (Hz); equal to `freq_start` for a steady tone.
    pub freq_end: f32,
    /// Burst length in seconds.
    pub duration_secs: f32,
    /// Silence between bursts when looping, in seconds.
    pub pause_secs: f32,
    /// Short human-readable description.
    pub description: String,
}

impl SoundProfile {
    /// Steady tone at `freq`.
    #[must_use]
    pub fn tone(
        waveform: Waveform,
        freq: f32,
        duration_secs: f32,
        pause_secs: f32,
        description: &str,
    ) -> Self {
        Self::sweep(waveform, freq, freq, duration_secs, pause_secs, description)
    }

    /// Linear sweep from `freq_start` to `freq_end`.
    #[must_use]
    pub fn sweep(
        waveform: Waveform,
        freq_start: f32,
        freq_end: f32,
        duration_secs: f32,
        pause_secs: f32,
        description: &str,
    ) -> Self {
        Self {
            waveform,
            freq_start,
            freq_end,
            duration_secs,
            pause_secs,
            description: description.to_owned(),
        }
    }
}

/// Render `profile` to mono samples in `[-GAIN, GAIN]`.
#[must_use]
pub fn synthesize(profile: &SoundProfile, sample_rate: u32) -> Vec<f32> {
    let rate = sample_rate as f32;
    let n = (rate * profile.duration_secs.max(0.0)) as usize;
    if n == 0 {
        return Vec::new();
    }

    let attack_len = rate * ATTACK_SECS;
    let release_len = rate * RELEASE_SECS;

    (0..n)
        .map(|i| {
            let t = i as f32 / rate;
            let progress = i as f32 / n as f32;
            let f = profile.freq_start + (profile.freq_end - profile.freq_start) * progress;
            let cycles = f * t;

            let value = match profile.waveform {
                Waveform::Sine => (2.0 * PI * cycles).sin(),
                Waveform::Square => {
                    if (2.0 * PI * cycles).sin() >= 0.0 {
                        1.0
                    } else {
                        -1.0
                    }
                }
                Waveform::Sawtooth => 2.0 * cycles.rem_euclid(1.0) - 1.0,
                Waveform::Triangle => 2.0 * (2.0 * cycles.rem_euclid(1.0) - 1.0).abs() - 1.0,
            };

            let attack = (i as f32 / attack_len).min(1.0);
            let release = ((n - i) as f32 / release_len).min(1.0);
            value * attack * release * GAIN
        })
        .collect()
}

/// Convert `f32` samples to 16-bit PCM.
#[must_use]
pub fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
        .collect()
}
