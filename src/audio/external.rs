//! Playback through external player processes and the terminal bell.

use crate::audio::playback::{Clip, PlaybackBackend};
use crate::audio::synth::to_pcm16;
use crate::platform::HostOs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Program and arguments for one player run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInvocation {
    pub program: &'static str,
    pub args: Vec<String>,
}

fn powershell_sound_player(path: &Path) -> PlayerInvocation {
    let escaped = path.display().to_string().replace('\'', "''");
    PlayerInvocation {
        program: "powershell",
        args: vec![
            "-c".to_owned(),
            format!("(New-Object Media.SoundPlayer '{escaped}').PlaySync()"),
        ],
    }
}

/// Player for a WAV file produced from a synthesized clip.
#[must_use]
pub fn wav_player_command(os: HostOs, path: &Path) -> Option<PlayerInvocation> {
    let path_arg = path.display().to_string();
    match os {
        HostOs::Linux => Some(PlayerInvocation {
            program: "aplay",
            args: vec!["-q".to_owned(), path_arg],
        }),
        HostOs::MacOs => Some(PlayerInvocation {
            program: "afplay",
            args: vec![path_arg],
        }),
        HostOs::Windows => Some(powershell_sound_player(path)),
        HostOs::Other => None,
    }
}

/// Player for an arbitrary audio file (wav, mp3, ogg, ...).
///
/// On Linux, `ffplay` is preferred, then `mpg123`, then `aplay` (wav only);
/// `has_program` reports which of them are installed.
#[must_use]
pub fn file_player_command(
    os: HostOs,
    path: &Path,
    has_program: impl Fn(&str) -> bool,
) -> Option<PlayerInvocation> {
    let path_arg = path.display().to_string();
    match os {
        HostOs::Linux if has_program("ffplay") => Some(PlayerInvocation {
            program: "ffplay",
            args: vec![
                "-nodisp".to_owned(),
                "-autoexit".to_owned(),
                "-loglevel".to_owned(),
                "quiet".to_owned(),
                path_arg,
            ],
        }),
        HostOs::Linux if has_program("mpg123") => Some(PlayerInvocation {
            program: "mpg123",
            args: vec!["-q".to_owned(), path_arg],
        }),
        HostOs::Linux | HostOs::MacOs | HostOs::Windows => wav_player_command(os, path),
        HostOs::Other => None,
    }
}

fn program_on_path(program: &str) -> bool {
    which::which(program).is_ok()
}

fn run_to_completion(invocation: &PlayerInvocation) -> anyhow::Result<()> {
    let status = Command::new(invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if !status.success() {
        anyhow::bail!("{} exited with {status}", invocation.program);
    }
    Ok(())
}

/// Reports whether a program is installed.
pub type ProgramCheck = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Spawns the platform's command-line player.
///
/// Tone clips are encoded to a temporary 16-bit WAV file first; the file is
/// removed once the player exits. A clip whose player is not installed
/// fails, so the chain moves on to the next backend.
pub struct ExternalPlayer {
    os: HostOs,
    has_program: ProgramCheck,
}

impl ExternalPlayer {
    /// Player for `os`, looking programs up on `PATH`.
    #[must_use]
    pub fn new(os: HostOs) -> Self {
        Self::with_program_check(os, Box::new(program_on_path))
    }

    /// Player for `os` with a custom installed-program check.
    #[must_use]
    pub fn with_program_check(os: HostOs, has_program: ProgramCheck) -> Self {
        Self { os, has_program }
    }

    /// Installed player for a WAV file, if any.
    #[must_use]
    pub fn wav_invocation(&self, path: &Path) -> Option<PlayerInvocation> {
        wav_player_command(self.os, path).filter(|inv| (self.has_program)(inv.program))
    }

    /// Installed player for an arbitrary audio file, if any.
    #[must_use]
    pub fn file_invocation(&self, path: &Path) -> Option<PlayerInvocation> {
        file_player_command(self.os, path, |p| (self.has_program)(p))
            .filter(|inv| (self.has_program)(inv.program))
    }
}

impl PlaybackBackend for ExternalPlayer {
    fn name(&self) -> &'static str {
        "external-player"
    }

    fn is_available(&self) -> bool {
        let probe = Path::new("probe.wav");
        self.wav_invocation(probe).is_some() || self.file_invocation(probe).is_some()
    }

    fn supports(&self, clip: &Clip) -> bool {
        matches!(clip, Clip::Tone { .. } | Clip::File(_))
    }

    fn play(&self, clip: &Clip) -> anyhow::Result<()> {
        match clip {
            Clip::Tone {
                samples,
                sample_rate,
            } => {
                let wav = tempfile::Builder::new()
                    .prefix("chronos-")
                    .suffix(".wav")
                    .tempfile()?;
                let Some(invocation) = self.wav_invocation(wav.path()) else {
                    anyhow::bail!("no wav player installed for {:?}", self.os);
                };
                write_wav(wav.path(), samples, *sample_rate)?;
                run_to_completion(&invocation)
            }
            Clip::File(path) => {
                let Some(invocation) = self.file_invocation(path) else {
                    anyhow::bail!("no file player installed for {:?}", self.os);
                };
                run_to_completion(&invocation)
            }
            Clip::Bell => anyhow::bail!("external player cannot ring the bell"),
        }
    }
}

/// Encode mono samples as a 16-bit PCM WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in to_pcm16(samples) {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Last resort: the ASCII bell on stdout.
pub struct TerminalBell;

impl PlaybackBackend for TerminalBell {
    fn name(&self) -> &'static str {
        "terminal-bell"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn supports(&self, _clip: &Clip) -> bool {
        true
    }

    fn is_last_resort(&self) -> bool {
        true
    }

    fn play(&self, _clip: &Clip) -> anyhow::Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(b"\x07")?;
        stdout.flush()?;
        Ok(())
    }
}
