//! Audio playback strategies and native output via cpal.
//!
//! Each mechanism implements [`PlaybackBackend`]. The dispatcher walks an
//! ordered list of backends and stops at the first one that plays the clip.

use crate::error::{ChronosError, Result};
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Extra time allowed past the clip length before a stream is abandoned.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Something a backend can be asked to play.
#[derive(Debug, Clone, PartialEq)]
pub enum Clip {
    /// Mono `f32` samples.
    Tone { samples: Vec<f32>, sample_rate: u32 },
    /// An audio file on disk.
    File(PathBuf),
    /// The terminal bell.
    Bell,
}

impl Clip {
    /// Playback length of a tone clip.
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self {
            Self::Tone {
                samples,
                sample_rate,
            } if *sample_rate > 0 => {
                Duration::from_secs_f64(samples.len() as f64 / f64::from(*sample_rate))
            }
            _ => Duration::ZERO,
        }
    }
}

/// One audio playback mechanism.
pub trait PlaybackBackend: Send + Sync {
    /// Short mechanism name for logs.
    fn name(&self) -> &'static str;

    /// Capability probe: whether this mechanism exists on the host.
    fn is_available(&self) -> bool;

    /// Whether this mechanism can play this kind of clip at all.
    fn supports(&self, clip: &Clip) -> bool {
        matches!(clip, Clip::Tone { .. })
    }

    /// Play `clip`, blocking until it has finished.
    fn play(&self, clip: &Clip) -> anyhow::Result<()>;

    /// Only tried once every alternative clip has been offered to the others.
    fn is_last_resort(&self) -> bool {
        false
    }
}

/// Low-latency output on a chosen device with an explicit mono stream.
pub struct CpalPlayback {
    output_device: Option<String>,
}

impl CpalPlayback {
    /// Playback on the named device, or the system default when `None`.
    #[must_use]
    pub fn new(output_device: Option<String>) -> Self {
        Self { output_device }
    }

    fn device(&self) -> Result<cpal::Device> {
        let host = cpal::default_host();

        if let Some(ref name) = self.output_device {
            host.output_devices()
                .map_err(|e| ChronosError::Audio(format!("cannot enumerate devices: {e}")))?
                .find(|d| {
                    d.description()
                        .ok()
                        .map(|desc| desc.name() == name)
                        .unwrap_or(false)
                })
                .ok_or_else(|| ChronosError::Audio(format!("output device '{name}' not found")))
        } else {
            host.default_output_device()
                .ok_or_else(|| ChronosError::Audio("no default output device".into()))
        }
    }
}

impl PlaybackBackend for CpalPlayback {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn is_available(&self) -> bool {
        self.device().is_ok()
    }

    fn play(&self, clip: &Clip) -> anyhow::Result<()> {
        let Clip::Tone {
            samples,
            sample_rate,
        } = clip
        else {
            anyhow::bail!("cpal plays tone clips only");
        };

        let device = self.device()?;
        let device_name = device
            .description()
            .map(|d| d.name().to_owned())
            .unwrap_or_else(|_| "<unknown>".into());
        info!("playing on output device: {device_name}");

        let stream_config = StreamConfig {
            channels: 1,
            sample_rate: *sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };
        play_blocking(&device, &stream_config, samples.clone(), clip.duration())?;
        Ok(())
    }
}

/// Fallback output on the default device using the device's own stream
/// format: the clip is resampled and copied to every channel.
pub struct CpalDefaultPlayback;

impl PlaybackBackend for CpalDefaultPlayback {
    fn name(&self) -> &'static str {
        "cpal-default"
    }

    fn is_available(&self) -> bool {
        cpal::default_host().default_output_device().is_some()
    }

    fn play(&self, clip: &Clip) -> anyhow::Result<()> {
        let Clip::Tone {
            samples,
            sample_rate,
        } = clip
        else {
            anyhow::bail!("cpal plays tone clips only");
        };

        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| ChronosError::Audio("no default output device".into()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| ChronosError::Audio(format!("no default output config: {e}")))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            anyhow::bail!(
                "default output format {:?} is not f32",
                supported.sample_format()
            );
        }

        let stream_config: StreamConfig = supported.config();
        let resampled = resample(samples, *sample_rate, stream_config.sample_rate);
        let interleaved = interleave(&resampled, usize::from(stream_config.channels));
        play_blocking(&device, &stream_config, interleaved, clip.duration())?;
        Ok(())
    }
}

/// Nearest-neighbour resampling; fidelity is not a concern for alert tones.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }
    let out_len = (samples.len() as u64 * u64::from(to_rate) / u64::from(from_rate)) as usize;
    (0..out_len)
        .map(|i| {
            let src = (i as u64 * u64::from(from_rate) / u64::from(to_rate)) as usize;
            samples[src.min(samples.len() - 1)]
        })
        .collect()
}

fn interleave(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .iter()
        .flat_map(|s| std::iter::repeat_n(*s, channels))
        .collect()
}

/// Play interleaved samples through `device`, blocking until drained.
fn play_blocking(
    device: &cpal::Device,
    stream_config: &StreamConfig,
    samples: Vec<f32>,
    expected: Duration,
) -> Result<()> {
    let buffer = Arc::new(Mutex::new(PlaybackBuffer {
        samples,
        position: 0,
        finished: false,
    }));

    let buffer_clone = Arc::clone(&buffer);

    let stream = device
        .build_output_stream(
            stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let mut buf = match buffer_clone.lock() {
                    Ok(b) => b,
                    Err(_) => return,
                };

                for sample in data.iter_mut() {
                    if buf.position < buf.samples.len() {
                        *sample = buf.samples[buf.position];
                        buf.position += 1;
                    } else {
                        *sample = 0.0;
                        buf.finished = true;
                    }
                }
            },
            move |err| {
                error!("audio output stream error: {err}");
            },
            None,
        )
        .map_err(|e| ChronosError::Audio(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| ChronosError::Audio(format!("failed to start output stream: {e}")))?;

    let deadline = Instant::now() + expected + DRAIN_GRACE;
    loop {
        std::thread::sleep(Duration::from_millis(10));
        let buf = buffer
            .lock()
            .map_err(|e| ChronosError::Audio(format!("playback buffer lock poisoned: {e}")))?;
        if buf.finished {
            break;
        }
        if Instant::now() >= deadline {
            return Err(ChronosError::Audio(
                "output stream stalled before draining".into(),
            ));
        }
    }

    drop(stream);
    Ok(())
}

/// List available output devices.
///
/// # Errors
///
/// Returns an error if devices cannot be enumerated.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| ChronosError::Audio(format!("cannot enumerate devices: {e}")))?;

    let mut names = Vec::new();
    for device in devices {
        if let Ok(desc) = device.description() {
            names.push(desc.name().to_owned());
        }
    }
    Ok(names)
}

/// Internal buffer for tracking playback progress.
struct PlaybackBuffer {
    samples: Vec<f32>,
    position: usize,
    finished: bool,
}
