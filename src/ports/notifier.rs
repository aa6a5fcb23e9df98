//! Notifier port for email/SMS delivery.
//!
//! Delivery is an external collaborator. Callers treat it as best-effort:
//! a failed send is logged and never undoes or blocks a transition.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::foundation::{CenterId, EnrollmentId, Timestamp, UserId};

/// Who receives a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Recipient {
    /// A platform user, resolved to an address by the delivery service.
    User(UserId),
    /// A raw contact (center owner phone or email).
    Contact(String),
}

/// Notification categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OwnerNotice,
    Receipt,
    PaymentWarning,
    EjectionNotice,
    SubscriptionWarning,
}

/// Notification content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// A center owner received a payment.
    OwnerPayment {
        center_id: CenterId,
        center_name: String,
        enrollment_id: EnrollmentId,
        amount: i64,
    },
    /// A student's payment was applied.
    PaymentReceipt {
        enrollment_id: EnrollmentId,
        course_title: String,
        amount: i64,
        next_payment_due: Option<Timestamp>,
    },
    /// A seat payment falls due soon. `pay_path` opens the payment page.
    PaymentWarning {
        enrollment_id: EnrollmentId,
        days_remaining: u32,
        due_at: Timestamp,
        amount: i64,
        pay_path: String,
    },
    EjectionNotice {
        enrollment_id: EnrollmentId,
        days_overdue: u32,
        re_enrollment_deadline: Timestamp,
        amount_due: i64,
        pay_path: String,
    },
    SubscriptionWarning {
        days_remaining: u32,
        paid_until: Timestamp,
        price: i64,
    },
}

/// Site path of the page where the owner pays for an enrollment, relative
/// to the public app URL the delivery service renders links with.
pub fn enrollment_pay_path(enrollment_id: &EnrollmentId) -> String {
    format!("/enrollment/{}/pay", enrollment_id)
}

/// A message to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub payload: NotificationPayload,
}

impl Notification {
    pub fn new(recipient: Recipient, payload: NotificationPayload) -> Self {
        Self { recipient, payload }
    }

    pub fn kind(&self) -> NotificationKind {
        match self.payload {
            NotificationPayload::OwnerPayment { .. } => NotificationKind::OwnerNotice,
            NotificationPayload::PaymentReceipt { .. } => NotificationKind::Receipt,
            NotificationPayload::PaymentWarning { .. } => NotificationKind::PaymentWarning,
            NotificationPayload::EjectionNotice { .. } => NotificationKind::EjectionNotice,
            NotificationPayload::SubscriptionWarning { .. } => {
                NotificationKind::SubscriptionWarning
            }
        }
    }
}

/// Delivery failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("recipient could not be resolved: {0}")]
    UnknownRecipient(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl NotificationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, NotificationError::Delivery(_))
    }
}

/// Port for sending notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotificationError>;
}
