//! Fire events forwarded to connected clients.
//!
//! The schedulers only know a single-argument callback. [`event_callbacks`]
//! builds the pair of callbacks that turn fires into [`ChronosEvent`]s on an
//! unbounded channel, so a broadcaster (WebSocket hub, daemon log loop) can
//! consume them asynchronously.

use crate::scheduler::callback::FireCallback;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Something the schedulers want clients to know about.
///
/// Serializes to the broadcast wire shape, e.g.
/// `{"event": "alarm_ring", "alarm_id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChronosEvent {
    /// An alarm started ringing.
    AlarmRing { alarm_id: String },
    /// A task reminder became due.
    TaskReminder { task_id: String },
}

impl ChronosEvent {
    /// Id of the alarm or task concerned.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        match self {
            Self::AlarmRing { alarm_id } => alarm_id,
            Self::TaskReminder { task_id } => task_id,
        }
    }
}

/// Ring and reminder callbacks that forward into `tx`.
///
/// A send on a closed channel is reported as a callback failure, which the
/// scheduler logs and otherwise ignores.
#[must_use]
pub fn event_callbacks(tx: mpsc::UnboundedSender<ChronosEvent>) -> (FireCallback, FireCallback) {
    let ring_tx = tx.clone();
    let on_ring: FireCallback = Arc::new(move |id: &str| {
        ring_tx
            .send(ChronosEvent::AlarmRing {
                alarm_id: id.to_owned(),
            })
            .map_err(|_| anyhow::anyhow!("event channel closed"))
    });

    let on_reminder: FireCallback = Arc::new(move |id: &str| {
        tx.send(ChronosEvent::TaskReminder {
            task_id: id.to_owned(),
        })
        .map_err(|_| anyhow::anyhow!("event channel closed"))
    });

    (on_ring, on_reminder)
}
