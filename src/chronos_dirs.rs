//! Centralized application directory paths for Chronos.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data (alarms, tasks, sounds, logs) | `~/Library/Application Support/chronos/` | `~/.local/share/chronos/` |
//! | Config | `~/Library/Application Support/chronos/` | `~/.config/chronos/` |
//!
//! # Environment Overrides
//!
//! - `CHRONOS_DATA_DIR` overrides [`data_dir`]
//! - `CHRONOS_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds `alarms.json`, `tasks.json`, the custom sound registry, uploaded
/// sound files and logs.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("CHRONOS_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("chronos"))
        .unwrap_or_else(|| PathBuf::from("/tmp/chronos-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("CHRONOS_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("chronos"))
        .unwrap_or_else(|| PathBuf::from("/tmp/chronos-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Built-in (admin-provided) sound files directory (`data_dir()/builtin_sounds/`).
#[must_use]
pub fn builtin_sounds_dir() -> PathBuf {
    data_dir().join("builtin_sounds")
}
