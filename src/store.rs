//! Durable JSON store for the alarm and task collections.
//!
//! Each collection lives in its own document shaped as a single object with
//! one array field (`{"alarms": [...]}`, `{"tasks": [...]}`). Saves replace
//! the whole collection atomically (temp file → fsync → rename), so a crash
//! mid-write leaves the previously committed document intact.
//!
//! Loading never fails: a missing file, an unreadable file, or corrupt JSON
//! all yield an empty collection, and individually malformed records are
//! skipped.

use crate::error::{ChronosError, Result};
use crate::scheduler::types::{Alarm, Task};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// File name of the alarm collection inside the data directory.
pub const ALARMS_FILE: &str = "alarms.json";

/// File name of the task collection inside the data directory.
pub const TASKS_FILE: &str = "tasks.json";

/// One JSON document holding a single named array of records.
///
/// The collection carries its own lock guarding the document and its temp
/// sibling, so saves to different collections never contend.
pub struct JsonCollection<T> {
    path: PathBuf,
    key: &'static str,
    lock: Mutex<()>,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Bind a collection to `path`, storing records under the `key` field.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, key: &'static str) -> Self {
        Self {
            path: path.into(),
            key,
            lock: Mutex::new(()),
            _records: PhantomData,
        }
    }

    /// Path of the committed document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records in document order.
    pub fn load(&self) -> Vec<T> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("cannot read {}: {e}", self.path.display());
                return Vec::new();
            }
        };

        let document: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "ignoring corrupt {} collection at {}: {e}",
                    self.key,
                    self.path.display()
                );
                return Vec::new();
            }
        };

        let Some(rows) = document.get(self.key).and_then(|v| v.as_array()) else {
            return Vec::new();
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<T>(row.clone()) {
                Ok(record) => records.push(record),
                Err(e) => debug!("skipping malformed {} record: {e}", self.key),
            }
        }
        records
    }

    /// Replace the whole collection on disk.
    ///
    /// # Errors
    ///
    /// Returns [`ChronosError::Storage`] on serialization, write, or rename failure.
    pub fn save(&self, records: &[T]) -> Result<()> {
        let mut document = serde_json::Map::new();
        document.insert(
            self.key.to_owned(),
            serde_json::to_value(records).map_err(|e| {
                ChronosError::Storage(format!("cannot serialize {}: {e}", self.key))
            })?,
        );
        let json = serde_json::to_vec_pretty(&serde_json::Value::Object(document))
            .map_err(|e| ChronosError::Storage(format!("cannot serialize {}: {e}", self.key)))?;

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        write_atomic(&self.path, &json)
    }
}

/// Both entity collections rooted at one data directory.
pub struct Store {
    alarms: JsonCollection<Alarm>,
    tasks: JsonCollection<Task>,
}

impl Store {
    /// Open (and create if needed) the store under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).map_err(|e| {
            ChronosError::Storage(format!(
                "cannot create data directory {}: {e}",
                data_dir.display()
            ))
        })?;

        Ok(Self {
            alarms: JsonCollection::new(data_dir.join(ALARMS_FILE), "alarms"),
            tasks: JsonCollection::new(data_dir.join(TASKS_FILE), "tasks"),
        })
    }

    /// Load alarms. Every loaded alarm comes back not ringing.
    pub fn load_alarms(&self) -> Vec<Alarm> {
        let mut alarms = self.alarms.load();
        for alarm in &mut alarms {
            alarm.ringing = false;
        }
        alarms
    }

    /// Persist the full alarm collection. `ringing` is always written as `false`.
    ///
    /// # Errors
    ///
    /// Returns [`ChronosError::Storage`] if the atomic replace fails.
    pub fn save_alarms(&self, alarms: &[Alarm]) -> Result<()> {
        let records: Vec<Alarm> = alarms
            .iter()
            .cloned()
            .map(|mut alarm| {
                alarm.ringing = false;
                alarm
            })
            .collect();
        self.alarms.save(&records)
    }

    /// Load tasks.
    pub fn load_tasks(&self) -> Vec<Task> {
        self.tasks.load()
    }

    /// Persist the full task collection.
    ///
    /// # Errors
    ///
    /// Returns [`ChronosError::Storage`] if the atomic replace fails.
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        self.tasks.save(tasks)
    }

    /// Path of the alarm document.
    #[must_use]
    pub fn alarms_path(&self) -> &Path {
        self.alarms.path()
    }

    /// Path of the task document.
    #[must_use]
    pub fn tasks_path(&self) -> &Path {
        self.tasks.path()
    }
}

/// Write `bytes` to `path` atomically (temp file → fsync → rename).
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = stage_temp(path, bytes)?;
    commit_temp(&tmp_path, path)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the sibling temp file and flush it to disk. The target is untouched.
fn stage_temp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ChronosError::Storage(format!(
                "failed to create directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let tmp_path = temp_path_for(path);
    let mut file = std::fs::File::create(&tmp_path).map_err(|e| {
        ChronosError::Storage(format!(
            "failed to create temp file '{}': {e}",
            tmp_path.display()
        ))
    })?;
    file.write_all(bytes)
        .map_err(|e| ChronosError::Storage(format!("failed to write temp file: {e}")))?;
    file.sync_all()
        .map_err(|e| ChronosError::Storage(format!("failed to sync temp file: {e}")))?;
    Ok(tmp_path)
}

fn commit_temp(tmp_path: &Path, path: &Path) -> Result<()> {
    std::fs::rename(tmp_path, path).map_err(|e| {
        ChronosError::Storage(format!(
            "failed to rename '{}' to '{}': {e}",
            tmp_path.display(),
            path.display()
        ))
    })
}
