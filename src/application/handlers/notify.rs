//! Best-effort notification delivery shared by handlers.

use crate::ports::{Notification, Notifier};

/// Sends a notification, logging failures. A failed send never fails the
/// transition that triggered it.
pub(crate) async fn send_best_effort(notifier: &dyn Notifier, notification: Notification) {
    let kind = notification.kind();
    if let Err(e) = notifier.send(notification).await {
        tracing::warn!(?kind, error = %e, retryable = e.is_retryable(), "Notification not delivered");
    }
}
