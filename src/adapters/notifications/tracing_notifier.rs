use async_trait::async_trait;

use crate::ports::{Notification, NotificationError, Notifier, Recipient};

/// Notifier that logs notifications under the `notifications` target.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError> {
        let recipient = match &notification.recipient {
            Recipient::User(user_id) => user_id.to_string(),
            Recipient::Contact(contact) if contact.trim().is_empty() => {
                return Err(NotificationError::UnknownRecipient(
                    "empty contact".to_string(),
                ));
            }
            Recipient::Contact(contact) => contact.clone(),
        };

        let payload = serde_json::to_string(&notification.payload)
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        tracing::info!(
            target: "notifications",
            kind = ?notification.kind(),
            recipient = %recipient,
            payload = %payload,
            "Notification queued"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use crate::ports::NotificationPayload;

    fn warning(recipient: Recipient) -> Notification {
        Notification::new(
            recipient,
            NotificationPayload::SubscriptionWarning {
                days_remaining: 3,
                paid_until: Timestamp::now(),
                price: 1000,
            },
        )
    }

    #[tokio::test]
    async fn accepts_contact_recipient() {
        let notifier = TracingNotifier::new();
        let result = notifier
            .send(warning(Recipient::Contact("owner@example.com".to_string())))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn rejects_blank_contact() {
        let notifier = TracingNotifier::new();
        let err = notifier
            .send(warning(Recipient::Contact("  ".to_string())))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::UnknownRecipient(_)));
        assert!(!err.is_retryable());
    }
}
