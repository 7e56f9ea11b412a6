//! Background worker lifecycle shared by both schedulers.
//!
//! A worker is one tokio task that waits on "period elapsed or cancelled"
//! and runs an evaluation pass on every period. Stopping is cooperative:
//! the cancellation token wakes the wait immediately, but a pass already
//! running completes first.

use crate::error::{ChronosError, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Handle to a running worker.
pub(crate) struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

fn slot(worker: &Mutex<Option<Worker>>) -> MutexGuard<'_, Option<Worker>> {
    worker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Time until just past the next whole wall-clock second.
fn until_next_second() -> Duration {
    let nanos = u64::from(chrono::Local::now().timestamp_subsec_nanos()).min(999_999_999);
    Duration::from_nanos(1_000_000_000 - nanos) + Duration::from_millis(5)
}

/// Interval whose deadlines stay on the `first + k * period` grid.
///
/// Late ticks are skipped rather than re-based, so a stall does not shift
/// the phase set up by `first`.
fn ticker(first: Instant, period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(first, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Spawn a worker running `pass` every `period` unless one is already running.
///
/// `pass` returns `false` when its owner is gone and the worker should exit.
/// With `align_to_second`, passes land just after wall-clock second
/// boundaries; otherwise the first pass runs immediately.
pub(crate) fn start<F>(
    worker: &Mutex<Option<Worker>>,
    name: &'static str,
    period: Duration,
    align_to_second: bool,
    mut pass: F,
) -> Result<()>
where
    F: FnMut() -> bool + Send + 'static,
{
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
        ChronosError::Scheduler(format!("{name} scheduler must start inside a tokio runtime"))
    })?;

    let mut slot = slot(worker);
    if slot.as_ref().is_some_and(|w| !w.cancel.is_cancelled()) {
        debug!(scheduler = name, "already running");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = runtime.spawn(async move {
        let first = if align_to_second {
            Instant::now() + until_next_second()
        } else {
            Instant::now()
        };
        let mut interval = ticker(first, period);
        info!(scheduler = name, period_ms = period.as_millis() as u64, "scheduler started");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    if !pass() {
                        debug!(scheduler = name, "owner dropped, exiting");
                        break;
                    }
                }
            }
        }
        info!(scheduler = name, "scheduler stopped");
    });

    *slot = Some(Worker { cancel, handle });
    Ok(())
}

/// Signal the worker to stop. Returns immediately.
pub(crate) fn stop(worker: &Mutex<Option<Worker>>, name: &'static str) {
    if let Some(w) = slot(worker).as_ref() {
        if !w.cancel.is_cancelled() {
            debug!(scheduler = name, "stop requested");
            w.cancel.cancel();
        }
    }
}

/// Stop the worker and wait for its task to finish.
pub(crate) async fn shutdown(worker: &Mutex<Option<Worker>>, name: &'static str) {
    let Some(w) = slot(worker).take() else {
        return;
    };
    w.cancel.cancel();
    if let Err(e) = w.handle.await {
        warn!(scheduler = name, "worker task ended abnormally: {e}");
    }
}

/// Whether a worker is live and not cancelled.
pub(crate) fn is_running(worker: &Mutex<Option<Worker>>) -> bool {
    slot(worker)
        .as_ref()
        .is_some_and(|w| !w.cancel.is_cancelled() && !w.handle.is_finished())
}
