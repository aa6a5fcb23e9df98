//! RecordManualPaymentHandler - Admin command for a payment collected
//! outside the gateway (cash at the center, bank transfer).

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::billing::BillingPolicy;
use crate::domain::enrollment::{ActivationKind, Enrollment, EnrollmentError};
use crate::domain::foundation::{EnrollmentId, Timestamp};
use crate::ports::{
    CourseReader, EnrollmentRepository, Notification, NotificationPayload, Notifier, Recipient,
};

use super::{commit_update, load, MAX_COMMIT_ATTEMPTS};
use crate::application::handlers::notify::send_best_effort;

#[derive(Debug, Clone)]
pub struct RecordManualPaymentCommand {
    pub enrollment_id: EnrollmentId,
    pub amount: i64,
}

#[derive(Debug, Clone)]
pub struct RecordManualPaymentResult {
    pub enrollment: Enrollment,
    pub kind: ActivationKind,
    /// Id the payment was recorded under.
    pub payment_id: String,
}

/// Applies a manual payment through the same activation path as a gateway
/// success: earnings are credited, an ejection is cleared, and an Active
/// enrollment gets another period.
pub struct RecordManualPaymentHandler {
    enrollments: Arc<dyn EnrollmentRepository>,
    courses: Arc<dyn CourseReader>,
    notifier: Arc<dyn Notifier>,
    policy: BillingPolicy,
}

impl RecordManualPaymentHandler {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        courses: Arc<dyn CourseReader>,
        notifier: Arc<dyn Notifier>,
        policy: BillingPolicy,
    ) -> Self {
        Self {
            enrollments,
            courses,
            notifier,
            policy,
        }
    }

    pub async fn handle(
        &self,
        cmd: RecordManualPaymentCommand,
    ) -> Result<RecordManualPaymentResult, EnrollmentError> {
        if cmd.amount <= 0 {
            return Err(EnrollmentError::validation("amount", "must be greater than zero"));
        }
        let payment_id = format!("manual_{}", Uuid::new_v4().simple());

        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let mut enrollment = load(self.enrollments.as_ref(), &cmd.enrollment_id).await?;
            let version = enrollment.version;
            let now = Timestamp::now();
            let activation = enrollment.activate(&payment_id, cmd.amount, now, &self.policy)?;

            if activation.kind == ActivationKind::AlreadyProcessed {
                return Ok(RecordManualPaymentResult {
                    enrollment,
                    kind: activation.kind,
                    payment_id,
                });
            }

            if let Some(saved) =
                commit_update(self.enrollments.as_ref(), enrollment, version, activation.effect, now)
                    .await?
            {
                tracing::info!(
                    enrollment_id = %saved.id,
                    payment_id = %payment_id,
                    amount = cmd.amount,
                    kind = ?activation.kind,
                    "Manual payment recorded"
                );
                let course_title = match self.courses.find_by_id(&saved.course_id).await {
                    Ok(Some(course)) => course.title,
                    _ => String::new(),
                };
                send_best_effort(
                    self.notifier.as_ref(),
                    Notification::new(
                        Recipient::User(saved.user_id.clone()),
                        NotificationPayload::PaymentReceipt {
                            enrollment_id: saved.id,
                            course_title,
                            amount: cmd.amount,
                            next_payment_due: saved.next_payment_due,
                        },
                    ),
                )
                .await;
                return Ok(RecordManualPaymentResult {
                    enrollment: saved,
                    kind: activation.kind,
                    payment_id,
                });
            }
        }
        Err(EnrollmentError::Conflict(cmd.enrollment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::notifications::RecordingNotifier;
    use crate::application::handlers::enrollment::test_support::{center, seat_course, shared, user};
    use crate::application::handlers::enrollment::{ClaimSeatCommand, ClaimSeatHandler};
    use crate::domain::enrollment::EnrollmentStatus;

    #[tokio::test]
    async fn manual_payment_activates_and_credits() {
        let (store, course, c) = seat_course(2).await;
        let claim = ClaimSeatHandler::new(shared(&store), shared(&store), shared(&store), BillingPolicy::default());
        let e = claim
            .handle(ClaimSeatCommand { user_id: user("quinn"), course_id: course.id, center_id: c.id })
            .await
            .unwrap()
            .enrollment;
        let notifier = RecordingNotifier::new();
        let handler = RecordManualPaymentHandler::new(
            shared(&store),
            shared(&store),
            Arc::new(notifier.clone()),
            BillingPolicy::default(),
        );

        let result = handler
            .handle(RecordManualPaymentCommand { enrollment_id: e.id, amount: 5000 })
            .await
            .unwrap();

        assert_eq!(result.kind, ActivationKind::Activated);
        assert_eq!(result.enrollment.status, EnrollmentStatus::Active);
        assert!(result.payment_id.starts_with("manual_"));
        let stored_center = center(&store, &c.id).await;
        assert_eq!(stored_center.total_earnings, 5000);
        assert_eq!(stored_center.current_enrollment, 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn second_manual_payment_renews() {
        let (store, course, c) = seat_course(2).await;
        let claim = ClaimSeatHandler::new(shared(&store), shared(&store), shared(&store), BillingPolicy::default());
        let e = claim
            .handle(ClaimSeatCommand { user_id: user("quinn"), course_id: course.id, center_id: c.id })
            .await
            .unwrap()
            .enrollment;
        let handler = RecordManualPaymentHandler::new(
            shared(&store),
            shared(&store),
            Arc::new(RecordingNotifier::new()),
            BillingPolicy::default(),
        );
        let first = handler
            .handle(RecordManualPaymentCommand { enrollment_id: e.id, amount: 5000 })
            .await
            .unwrap();

        let second = handler
            .handle(RecordManualPaymentCommand { enrollment_id: e.id, amount: 5000 })
            .await
            .unwrap();

        assert_eq!(second.kind, ActivationKind::Renewed);
        assert!(second.enrollment.next_payment_due.unwrap().is_after(&first.enrollment.next_payment_due.unwrap()));
        assert_eq!(center(&store, &c.id).await.total_earnings, 10_000);
    }

    #[tokio::test]
    async fn non_positive_amount_is_rejected() {
        let (store, _course, _c) = seat_course(2).await;
        let handler = RecordManualPaymentHandler::new(
            shared(&store),
            shared(&store),
            Arc::new(RecordingNotifier::new()),
            BillingPolicy::default(),
        );

        let err = handler
            .handle(RecordManualPaymentCommand { enrollment_id: EnrollmentId::new(), amount: 0 })
            .await
            .unwrap_err();

        assert!(matches!(err, EnrollmentError::ValidationFailed { ref field, .. } if field == "amount"));
    }
}
