//! Shared helpers for integration tests.

use chrono::NaiveDateTime;
use chronos::Store;
use chronos::scheduler::{Clock, FixedClock};
use std::sync::Arc;

/// Parse `YYYY-MM-DDTHH:MM:SS[.fff]` as a local date-time.
pub(crate) fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").expect("valid test timestamp")
}

/// A store rooted in a fresh temporary directory.
pub(crate) fn temp_store() -> (tempfile::TempDir, Arc<Store>) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = Arc::new(Store::open(dir.path()).expect("open store"));
    (dir, store)
}

/// A manually driven clock starting at `start`, plus the same clock as a trait object.
pub(crate) fn fixed_clock(start: &str) -> (Arc<FixedClock>, Arc<dyn Clock>) {
    let clock = Arc::new(FixedClock::new(at(start)));
    let dynamic: Arc<dyn Clock> = Arc::clone(&clock) as Arc<dyn Clock>;
    (clock, dynamic)
}
