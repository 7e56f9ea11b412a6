//! Configuration types for the alarm and reminder engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChronosConfig {
    /// Where alarm, task, and custom sound state lives.
    pub storage: StorageConfig,
    /// Alarm ticker settings.
    pub alarms: AlarmConfig,
    /// Reminder monitor settings.
    pub reminders: ReminderConfig,
    /// Sound catalog and playback settings.
    pub sound: SoundConfig,
    /// Desktop notification settings.
    pub notifications: NotificationConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Durable store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory (None = [`crate::chronos_dirs::data_dir`]).
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolved data directory.
    #[must_use]
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(crate::chronos_dirs::data_dir)
    }
}

/// Alarm ticker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Play the alarm's sound locally (looping) while it rings.
    pub local_playback: bool,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            local_playback: true,
        }
    }
}

/// Reminder monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Seconds between reminder evaluation passes.
    ///
    /// The fire window is fixed at 30 seconds; a poll interval longer than
    /// that can skip reminders.
    pub poll_interval_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
        }
    }
}

/// Sound playback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Profile used when a sound name cannot be resolved.
    pub default_sound: String,
    /// Output device name (None = system default).
    pub output_device: Option<String>,
    /// Sample rate for synthesized sounds in Hz.
    pub sample_rate: u32,
    /// Directory of built-in audio files (None = [`crate::chronos_dirs::builtin_sounds_dir`]).
    pub sounds_dir: Option<PathBuf>,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            default_sound: crate::audio::catalog::DEFAULT_SOUND.to_owned(),
            output_device: None,
            sample_rate: 44_100,
            sounds_dir: None,
        }
    }
}

/// Desktop notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Whether task reminders pop up a desktop notification.
    pub enabled: bool,
    /// Notification lifetime hint in milliseconds (where the notifier supports it).
    pub expire_ms: u32,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expire_ms: 8_000,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write a daily-rolling log file under [`crate::chronos_dirs::logs_dir`].
    pub file: bool,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: false,
            filter: "chronos=info".to_owned(),
        }
    }
}

impl ChronosConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::ChronosError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ChronosError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::chronos_dirs::config_file()
    }

    /// Load the config at `path` if it exists, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is unreadable or invalid.
    pub fn load_or_default(path: &std::path::Path) -> crate::error::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}
