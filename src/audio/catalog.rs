//! Sound catalog: resolves a sound name to something playable.
//!
//! Three sources, checked in this order:
//! 1. built-in audio files dropped into the built-in sounds directory,
//!    named by their title-cased file stem (`deep_horn.wav` → "Deep Horn");
//! 2. user-uploaded custom sounds registered in `custom_sounds.json`;
//! 3. synthesized [`SoundProfile`]s.
//!
//! Unknown names resolve to the default profile.

use crate::audio::synth::{SoundProfile, Waveform};
use crate::config::ChronosConfig;
use crate::error::{ChronosError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Name of the fallback sound profile.
pub const DEFAULT_SOUND: &str = "Classic Beep";

/// File extensions recognised as audio files.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "m4a", "aac", "flac"];

/// Registry file for custom sounds, inside the data directory.
pub const CUSTOM_SOUNDS_FILE: &str = "custom_sounds.json";

/// Directory for uploaded custom sound files, inside the data directory.
pub const CUSTOM_SOUNDS_DIR: &str = "sounds";

/// Built-in synthesized profiles, in display order.
#[must_use]
pub fn builtin_profiles() -> Vec<(&'static str, SoundProfile)> {
    vec![
        (
            "Classic Beep",
            SoundProfile::tone(Waveform::Square, 880.0, 0.25, 0.1, "Sharp digital beep"),
        ),
        (
            "Gentle Bell",
            SoundProfile::tone(Waveform::Sine, 523.0, 0.6, 0.4, "Soft sine bell"),
        ),
        (
            "Alarm Siren",
            SoundProfile::sweep(
                Waveform::Sawtooth,
                400.0,
                800.0,
                0.4,
                0.05,
                "Rising siren waveform",
            ),
        ),
        (
            "Digital Pulse",
            SoundProfile::tone(Waveform::Square, 1200.0, 0.08, 0.05, "Fast digital pulse"),
        ),
        (
            "Deep Horn",
            SoundProfile::tone(Waveform::Triangle, 220.0, 0.8, 0.2, "Low triangle wave horn"),
        ),
    ]
}

fn builtin_profile(name: &str) -> Option<SoundProfile> {
    builtin_profiles()
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, p)| p)
}

/// What a sound name resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum SoundSource {
    /// Synthesize and play this profile.
    Synth(SoundProfile),
    /// Play this audio file.
    File(PathBuf),
    /// A registered custom sound whose file is gone; only the terminal bell is left.
    Bell,
}

/// Catalog entry as shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundInfo {
    pub name: String,
    pub description: String,
    /// `true` for user-uploaded sounds.
    pub custom: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CustomSoundEntry {
    filename: String,
    #[serde(default)]
    description: String,
}

/// Name → playable source lookup.
pub struct SoundCatalog {
    builtin_dir: PathBuf,
    custom_dir: PathBuf,
    registry_path: PathBuf,
    default_sound: String,
    registry_lock: Mutex<()>,
}

impl SoundCatalog {
    /// Catalog with custom sounds under `data_dir` and built-in files in `builtin_dir`.
    #[must_use]
    pub fn new(data_dir: &Path, builtin_dir: PathBuf, default_sound: impl Into<String>) -> Self {
        Self {
            builtin_dir,
            custom_dir: data_dir.join(CUSTOM_SOUNDS_DIR),
            registry_path: data_dir.join(CUSTOM_SOUNDS_FILE),
            default_sound: default_sound.into(),
            registry_lock: Mutex::new(()),
        }
    }

    /// Catalog laid out according to `config`.
    #[must_use]
    pub fn from_config(config: &ChronosConfig) -> Self {
        let builtin_dir = config
            .sound
            .sounds_dir
            .clone()
            .unwrap_or_else(crate::chronos_dirs::builtin_sounds_dir);
        Self::new(
            &config.storage.resolved_data_dir(),
            builtin_dir,
            config.sound.default_sound.clone(),
        )
    }

    /// Directory where custom sound files must be saved before registering.
    #[must_use]
    pub fn custom_sounds_dir(&self) -> &Path {
        &self.custom_dir
    }

    /// The profile used for unknown names.
    #[must_use]
    pub fn default_profile(&self) -> SoundProfile {
        builtin_profile(&self.default_sound)
            .or_else(|| builtin_profile(DEFAULT_SOUND))
            .unwrap_or_else(|| SoundProfile::tone(Waveform::Square, 880.0, 0.25, 0.1, "beep"))
    }

    /// Every known sound: synthesized profiles, built-in files, then custom sounds.
    #[must_use]
    pub fn list(&self) -> Vec<SoundInfo> {
        let mut sounds: Vec<SoundInfo> = builtin_profiles()
            .into_iter()
            .map(|(name, profile)| SoundInfo {
                name: name.to_owned(),
                description: profile.description,
                custom: false,
            })
            .collect();

        for (name, path) in self.scan_builtin_files() {
            let file_name = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            sounds.push(SoundInfo {
                name,
                description: format!("Built-in: {file_name}"),
                custom: false,
            });
        }

        for (name, entry) in self.load_registry() {
            sounds.push(SoundInfo {
                name,
                description: entry.description,
                custom: true,
            });
        }
        sounds
    }

    /// Names of every known sound.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.list().into_iter().map(|s| s.name).collect()
    }

    /// Resolve `name` to a playable source.
    #[must_use]
    pub fn resolve(&self, name: &str) -> SoundSource {
        if let Some(path) = self.scan_builtin_files().remove(name) {
            return SoundSource::File(path);
        }

        if let Some(entry) = self.load_registry().remove(name) {
            let path = self.custom_dir.join(&entry.filename);
            if path.is_file() {
                return SoundSource::File(path);
            }
            warn!(sound = name, "custom sound file missing: {}", path.display());
            return SoundSource::Bell;
        }

        match builtin_profile(name) {
            Some(profile) => SoundSource::Synth(profile),
            None => {
                debug!(sound = name, "unknown sound, using default profile");
                SoundSource::Synth(self.default_profile())
            }
        }
    }

    /// Synthesized profile sharing `name`, if it is one of the built-ins.
    #[must_use]
    pub fn profile_for(&self, name: &str) -> Option<SoundProfile> {
        builtin_profile(name)
    }

    /// Pause between plays when looping `name`.
    #[must_use]
    pub fn pause_for(&self, name: &str) -> Duration {
        let profile = builtin_profile(name).unwrap_or_else(|| self.default_profile());
        Duration::from_secs_f32(profile.pause_secs.max(0.0))
    }

    /// Register a custom sound whose file is already in [`custom_sounds_dir`](Self::custom_sounds_dir).
    ///
    /// # Errors
    ///
    /// Returns [`ChronosError::Catalog`] for an empty name or a filename that
    /// is not a plain file name, and a storage error if the registry cannot
    /// be written.
    pub fn add_custom_sound(&self, name: &str, filename: &str, description: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(ChronosError::Catalog("sound name must not be empty".to_owned()));
        }
        let is_plain = Path::new(filename)
            .file_name()
            .is_some_and(|f| f == std::ffi::OsStr::new(filename));
        if !is_plain {
            return Err(ChronosError::Catalog(format!(
                "invalid sound file name '{filename}'"
            )));
        }

        let _guard = self
            .registry_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut registry = self.load_registry();
        registry.insert(
            name.to_owned(),
            CustomSoundEntry {
                filename: filename.to_owned(),
                description: description.to_owned(),
            },
        );
        self.save_registry(&registry)
    }

    /// Remove a custom sound and its file. Returns `true` when it was registered.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the registry cannot be rewritten. A file
    /// that cannot be deleted is only logged.
    pub fn delete_custom_sound(&self, name: &str) -> Result<bool> {
        let entry = {
            let _guard = self
                .registry_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let mut registry = self.load_registry();
            let Some(entry) = registry.remove(name) else {
                return Ok(false);
            };
            self.save_registry(&registry)?;
            entry
        };

        let path = self.custom_dir.join(&entry.filename);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("cannot delete custom sound file {}: {e}", path.display()),
        }
        Ok(true)
    }

    fn load_registry(&self) -> BTreeMap<String, CustomSoundEntry> {
        let bytes = match std::fs::read(&self.registry_path) {
            Ok(bytes) => bytes,
            Err(_) => return BTreeMap::new(),
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!("ignoring corrupt custom sound registry: {e}");
            BTreeMap::new()
        })
    }

    fn save_registry(&self, registry: &BTreeMap<String, CustomSoundEntry>) -> Result<()> {
        let json = serde_json::to_vec_pretty(registry)
            .map_err(|e| ChronosError::Catalog(format!("cannot serialize registry: {e}")))?;
        crate::store::write_atomic(&self.registry_path, &json)
    }

    fn scan_builtin_files(&self) -> BTreeMap<String, PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.builtin_dir) else {
            return BTreeMap::new();
        };

        entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_audio_file(path))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_string_lossy().into_owned();
                Some((title_case(&stem.replace('_', " ")), path))
            })
            .collect()
    }
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

/// Upper-case the first letter of each word, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
