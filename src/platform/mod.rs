//! Platform-specific desktop notifications.
//!
//! Provides a cross-platform [`DesktopNotifier`] trait. The command-based
//! notifier talks to the OS notification daemon through one external
//! process per notification (`notify-send`, `osascript`, or PowerShell); when
//! that binary is absent, or the host OS has no known notifier, a no-op stub
//! is used instead.

use crate::config::NotificationConfig;
use std::sync::Arc;
use tracing::debug;

mod command;
mod stub;

pub use command::{CommandNotifier, NotifierInvocation, notification_command};
pub use stub::NoopNotifier;

/// Host operating system family, used to pick external helper programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl HostOs {
    /// The OS this process is running on.
    #[must_use]
    pub fn current() -> Self {
        Self::from_name(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            _ => Self::Other,
        }
    }
}

/// Shows an OS-level popup for a task reminder.
pub trait DesktopNotifier: Send + Sync {
    /// Short mechanism name for logs.
    fn name(&self) -> &'static str;

    /// Whether the mechanism can be used on this host right now.
    fn is_available(&self) -> bool;

    /// Show a notification. Must not block waiting for the user.
    fn notify(&self, title: &str, body: &str) -> anyhow::Result<()>;
}

/// Create the notifier for this host.
///
/// Returns the command-based notifier when notifications are enabled and
/// its binary is on `PATH`, or a no-op stub otherwise.
pub fn create_notifier(config: &NotificationConfig) -> Arc<dyn DesktopNotifier> {
    if !config.enabled {
        return Arc::new(NoopNotifier);
    }

    let notifier = CommandNotifier::new(HostOs::current(), config.expire_ms);
    if notifier.is_available() {
        Arc::new(notifier)
    } else {
        debug!("no desktop notifier available on this host");
        Arc::new(NoopNotifier)
    }
}

/// Show a notification, ignoring every failure.
///
/// Returns `true` if the notifier accepted the request.
pub fn notify_best_effort(notifier: &dyn DesktopNotifier, title: &str, body: &str) -> bool {
    if !notifier.is_available() {
        return false;
    }
    match notifier.notify(title, body) {
        Ok(()) => true,
        Err(e) => {
            debug!(notifier = notifier.name(), "desktop notification failed: {e}");
            false
        }
    }
}
