//! Fire callbacks handed to the fan-out collaborator.
//!
//! A callback runs inline on the evaluator. Whatever it does (return an
//! error, panic) is turned into a [`CallbackOutcome`], logged, and never
//! allowed past the evaluation pass.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{error, warn};

/// Callback invoked with the id of the alarm or task that fired.
pub type FireCallback = Arc<dyn Fn(&str) -> anyhow::Result<()> + Send + Sync>;

/// Result of one callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// No callback registered.
    NotRegistered,
    /// The callback returned `Ok`.
    Delivered,
    /// The callback returned an error.
    Failed(String),
    /// The callback panicked.
    Panicked(String),
}

impl CallbackOutcome {
    /// `true` unless the callback failed or panicked.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::NotRegistered | Self::Delivered)
    }
}

/// Invoke `callback` for `entity_id`, absorbing every failure.
pub(crate) fn invoke(
    callback: Option<&FireCallback>,
    kind: &'static str,
    entity_id: &str,
) -> CallbackOutcome {
    let Some(callback) = callback else {
        return CallbackOutcome::NotRegistered;
    };

    let outcome = match catch_unwind(AssertUnwindSafe(|| callback(entity_id))) {
        Ok(Ok(())) => CallbackOutcome::Delivered,
        Ok(Err(e)) => CallbackOutcome::Failed(e.to_string()),
        Err(payload) => CallbackOutcome::Panicked(panic_message(payload.as_ref())),
    };

    match &outcome {
        CallbackOutcome::Failed(msg) => {
            warn!(kind, entity_id, "fire callback failed: {msg}");
        }
        CallbackOutcome::Panicked(msg) => {
            error!(kind, entity_id, "fire callback panicked: {msg}");
        }
        CallbackOutcome::NotRegistered | CallbackOutcome::Delivered => {}
    }
    outcome
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
