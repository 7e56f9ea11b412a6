//! No-op notifier for hosts without a usable notification mechanism.

use super::DesktopNotifier;

/// Notifier that does nothing.
///
/// Reports itself unavailable so callers can tell a skipped notification
/// from a delivered one.
pub struct NoopNotifier;

impl DesktopNotifier for NoopNotifier {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn notify(&self, _title: &str, _body: &str) -> anyhow::Result<()> {
        Ok(()) // no-op
    }
}
