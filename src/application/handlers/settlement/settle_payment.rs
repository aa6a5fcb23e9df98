//! SettlePaymentHandler - Applies a verified gateway notification.
//!
//! Dispatch is on the reference prefix: subscription payments extend the
//! payer's paid period, everything else settles an enrollment. Idempotency
//! comes from stored state, never from "this delivery arrived before":
//!
//! - a success already settled on the enrollment is `AlreadyProcessed`
//! - a failure on a Cancelled enrollment is `AlreadyProcessed`
//! - a subscription payment id is applied at most once by the repository
//!
//! Every delivery ends in the payment event log with its outcome.

use std::sync::Arc;

use crate::domain::billing::BillingPolicy;
use crate::domain::enrollment::{ActivationKind, Enrollment, EnrollmentStatus};
use crate::domain::foundation::{DomainError, EnrollmentId, Timestamp, UserId};
use crate::domain::payment::{PaymentNotification, PaymentReference, PaymentStatus, WebhookError};
use crate::domain::subscription::SubscriptionPolicy;
use crate::ports::{
    CenterRepository, CommitOutcome, CourseReader, EnrollmentChange, EnrollmentRepository,
    EventOutcome, Notification, NotificationPayload, Notifier, PaymentApplication,
    PaymentEventLog, PaymentEventRecord, Recipient, SaveResult, SubscriptionPayment,
    SubscriptionRepository,
};

use crate::application::handlers::enrollment::MAX_COMMIT_ATTEMPTS;
use crate::application::handlers::notify::send_best_effort;

/// Command carrying a notification whose signature was already verified.
#[derive(Debug, Clone)]
pub struct SettlePaymentCommand {
    pub notification: PaymentNotification,
}

/// What settlement did with one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReport {
    pub outcome: EventOutcome,
    pub detail: Option<String>,
    pub enrollment_id: Option<EnrollmentId>,
    pub kind: Option<ActivationKind>,
}

impl SettlementReport {
    fn ignored(detail: impl Into<String>) -> Self {
        Self {
            outcome: EventOutcome::Ignored,
            detail: Some(detail.into()),
            enrollment_id: None,
            kind: None,
        }
    }

    fn for_enrollment(outcome: EventOutcome, enrollment_id: EnrollmentId) -> Self {
        Self {
            outcome,
            detail: None,
            enrollment_id: Some(enrollment_id),
            kind: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    fn with_kind(mut self, kind: ActivationKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Handler for gateway payment notifications.
pub struct SettlePaymentHandler {
    enrollments: Arc<dyn EnrollmentRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    courses: Arc<dyn CourseReader>,
    centers: Arc<dyn CenterRepository>,
    events: Arc<dyn PaymentEventLog>,
    notifier: Arc<dyn Notifier>,
    billing: BillingPolicy,
    subscription: SubscriptionPolicy,
}

impl SettlePaymentHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        courses: Arc<dyn CourseReader>,
        centers: Arc<dyn CenterRepository>,
        events: Arc<dyn PaymentEventLog>,
        notifier: Arc<dyn Notifier>,
        billing: BillingPolicy,
        subscription: SubscriptionPolicy,
    ) -> Self {
        Self {
            enrollments,
            subscriptions,
            courses,
            centers,
            events,
            notifier,
            billing,
            subscription,
        }
    }

    /// Settles one delivery.
    ///
    /// # Errors
    ///
    /// - `Database` when storage failed; nothing was applied and a replay
    ///   of the same delivery will be processed normally
    pub async fn handle(&self, cmd: SettlePaymentCommand) -> Result<SettlementReport, WebhookError> {
        let notification = cmd.notification;
        let now = Timestamp::now();

        match self.settle(&notification, now).await {
            Ok(report) => {
                tracing::info!(
                    payment_id = %notification.payment_id,
                    status = notification.status.as_str(),
                    outcome = report.outcome.as_str(),
                    detail = report.detail.as_deref().unwrap_or(""),
                    "Payment notification settled"
                );
                self.record(&notification, &report, now).await;
                Ok(report)
            }
            Err(e) => {
                tracing::error!(
                    payment_id = %notification.payment_id,
                    error = %e,
                    "Payment notification could not be settled"
                );
                let failed = SettlementReport {
                    outcome: EventOutcome::Failed,
                    detail: Some(e.to_string()),
                    enrollment_id: None,
                    kind: None,
                };
                self.record(&notification, &failed, now).await;
                Err(e)
            }
        }
    }

    async fn settle(
        &self,
        notification: &PaymentNotification,
        now: Timestamp,
    ) -> Result<SettlementReport, WebhookError> {
        match &notification.status {
            PaymentStatus::Pending => {
                return Ok(SettlementReport::ignored("payment still pending"));
            }
            PaymentStatus::Unknown(raw) => {
                return Ok(SettlementReport::ignored(format!("unsupported status '{}'", raw)));
            }
            _ => {}
        }

        match notification.parsed_reference() {
            Some(PaymentReference::Subscription { user_id, .. }) => {
                self.settle_subscription(notification, user_id, now).await
            }
            None if notification.reference.is_some() => {
                Ok(SettlementReport::ignored("unrecognized payment reference"))
            }
            _ => self.settle_enrollment(notification, now).await,
        }
    }

    async fn settle_subscription(
        &self,
        notification: &PaymentNotification,
        user_id: UserId,
        now: Timestamp,
    ) -> Result<SettlementReport, WebhookError> {
        if notification.status.is_failure() {
            // Nothing was granted up front, so there is nothing to undo
            return Ok(SettlementReport::ignored("subscription payment not completed"));
        }

        let applied = self
            .subscriptions
            .apply_payment(SubscriptionPayment {
                user_id: user_id.clone(),
                payment_id: notification.payment_id.clone(),
                amount: self.subscription.price,
                billing: self.subscription.billing,
                at: now,
            })
            .await
            .map_err(storage)?;

        let report = match applied {
            PaymentApplication::Applied { paid_until } => {
                tracing::info!(user_id = %user_id, paid_until = %paid_until, "Subscription extended");
                SettlementReport {
                    outcome: EventOutcome::Applied,
                    detail: Some(format!("paid until {}", paid_until)),
                    enrollment_id: None,
                    kind: None,
                }
            }
            PaymentApplication::AlreadyApplied => SettlementReport {
                outcome: EventOutcome::AlreadyProcessed,
                detail: None,
                enrollment_id: None,
                kind: None,
            },
            PaymentApplication::UnknownUser => {
                tracing::warn!(user_id = %user_id, "Subscription payment for unknown user");
                SettlementReport {
                    outcome: EventOutcome::NeedsAttention,
                    detail: Some(format!("no account for user {}", user_id)),
                    enrollment_id: None,
                    kind: None,
                }
            }
        };
        Ok(report)
    }

    async fn settle_enrollment(
        &self,
        notification: &PaymentNotification,
        now: Timestamp,
    ) -> Result<SettlementReport, WebhookError> {
        let Some(mut current) = self.find_enrollment(notification).await? else {
            return Ok(SettlementReport::ignored("no enrollment for this payment"));
        };

        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let step = if notification.status.is_failure() {
                self.apply_failure(notification, current.clone(), now).await?
            } else {
                self.apply_success(notification, current.clone(), now).await?
            };

            match step {
                Step::Done(report) => return Ok(report),
                Step::Retry => {
                    current = match self
                        .enrollments
                        .find_by_id(&current.id)
                        .await
                        .map_err(storage)?
                    {
                        Some(e) => e,
                        None => return Ok(SettlementReport::ignored("enrollment disappeared")),
                    };
                }
            }
        }

        Err(WebhookError::Database(format!(
            "enrollment {} kept changing during settlement",
            current.id
        )))
    }

    async fn find_enrollment(
        &self,
        notification: &PaymentNotification,
    ) -> Result<Option<Enrollment>, WebhookError> {
        if let Some(found) = self
            .enrollments
            .find_by_payment_id(&notification.payment_id)
            .await
            .map_err(storage)?
        {
            return Ok(Some(found));
        }
        match notification.reference.as_deref() {
            Some(reference) => self
                .enrollments
                .find_by_reference(reference)
                .await
                .map_err(storage),
            None => Ok(None),
        }
    }

    async fn apply_success(
        &self,
        notification: &PaymentNotification,
        mut enrollment: Enrollment,
        now: Timestamp,
    ) -> Result<Step, WebhookError> {
        let id = enrollment.id;
        let version = enrollment.version;
        let credited = enrollment.amount;
        if let Some(amount) = notification.amount.filter(|a| *a != credited) {
            tracing::warn!(
                enrollment_id = %id,
                expected = credited,
                received = amount,
                "Gateway amount differs from enrollment amount"
            );
        }

        let activation =
            match enrollment.activate(&notification.payment_id, credited, now, &self.billing) {
                Ok(activation) => activation,
                Err(e) => {
                    return Ok(Step::Done(
                        SettlementReport::for_enrollment(EventOutcome::NeedsAttention, id)
                            .with_detail(e.to_string()),
                    ));
                }
            };

        if activation.kind == ActivationKind::AlreadyProcessed {
            return Ok(Step::Done(
                SettlementReport::for_enrollment(EventOutcome::AlreadyProcessed, id)
                    .with_kind(activation.kind),
            ));
        }

        let outcome = self
            .enrollments
            .commit(EnrollmentChange::update(enrollment, version, activation.effect, now))
            .await
            .map_err(storage)?;

        match outcome {
            CommitOutcome::Applied(saved) => {
                tracing::info!(
                    enrollment_id = %saved.id,
                    payment_id = %notification.payment_id,
                    kind = ?activation.kind,
                    "Enrollment payment applied"
                );
                self.notify_success(&saved, credited).await;
                Ok(Step::Done(
                    SettlementReport::for_enrollment(EventOutcome::Applied, saved.id)
                        .with_kind(activation.kind),
                ))
            }
            CommitOutcome::Conflict => Ok(Step::Retry),
            CommitOutcome::SeatUnavailable { center_id } => {
                tracing::warn!(
                    enrollment_id = %id,
                    center_id = %center_id,
                    payment_id = %notification.payment_id,
                    "Late payment received but the center has no seat left"
                );
                Ok(Step::Done(
                    SettlementReport::for_enrollment(EventOutcome::NeedsAttention, id)
                        .with_detail(format!("paid but no seat left at center {}", center_id)),
                ))
            }
        }
    }

    async fn apply_failure(
        &self,
        notification: &PaymentNotification,
        mut enrollment: Enrollment,
        now: Timestamp,
    ) -> Result<Step, WebhookError> {
        let id = enrollment.id;
        if !is_current_payment(&enrollment, notification) {
            return Ok(Step::Done(
                SettlementReport::for_enrollment(EventOutcome::Ignored, id)
                    .with_detail("failure for a payment that is no longer in flight"),
            ));
        }

        let version = enrollment.version;
        let effect = match enrollment.cancel_on_failure(now) {
            Ok(Some(effect)) => effect,
            Ok(None) if enrollment.status == EnrollmentStatus::Cancelled => {
                return Ok(Step::Done(SettlementReport::for_enrollment(
                    EventOutcome::AlreadyProcessed,
                    id,
                )));
            }
            Ok(None) => {
                return Ok(Step::Done(
                    SettlementReport::for_enrollment(EventOutcome::Ignored, id)
                        .with_detail(format!("enrollment is {}", enrollment.status.as_str())),
                ));
            }
            Err(e) => {
                return Ok(Step::Done(
                    SettlementReport::for_enrollment(EventOutcome::NeedsAttention, id)
                        .with_detail(e.to_string()),
                ));
            }
        };

        match self
            .enrollments
            .commit(EnrollmentChange::update(enrollment, version, effect, now))
            .await
            .map_err(storage)?
        {
            CommitOutcome::Applied(saved) => {
                tracing::info!(
                    enrollment_id = %saved.id,
                    payment_id = %notification.payment_id,
                    status = notification.status.as_str(),
                    "Enrollment cancelled after failed payment"
                );
                Ok(Step::Done(SettlementReport::for_enrollment(
                    EventOutcome::Applied,
                    saved.id,
                )))
            }
            CommitOutcome::Conflict => Ok(Step::Retry),
            CommitOutcome::SeatUnavailable { center_id } => Ok(Step::Done(
                SettlementReport::for_enrollment(EventOutcome::NeedsAttention, id)
                    .with_detail(format!("seat release refused at center {}", center_id)),
            )),
        }
    }

    async fn notify_success(&self, enrollment: &Enrollment, amount: i64) {
        if let Some(center_id) = enrollment.center_id {
            match self.centers.find_by_id(&center_id).await {
                Ok(Some(center)) => {
                    send_best_effort(
                        self.notifier.as_ref(),
                        Notification::new(
                            Recipient::Contact(center.owner_contact.clone()),
                            NotificationPayload::OwnerPayment {
                                center_id,
                                center_name: center.name.clone(),
                                enrollment_id: enrollment.id,
                                amount,
                            },
                        ),
                    )
                    .await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(center_id = %center_id, error = %e, "Owner notice skipped");
                }
            }
        }

        let course_title = match self.courses.find_by_id(&enrollment.course_id).await {
            Ok(Some(course)) => course.title,
            _ => String::new(),
        };
        send_best_effort(
            self.notifier.as_ref(),
            Notification::new(
                Recipient::User(enrollment.user_id.clone()),
                NotificationPayload::PaymentReceipt {
                    enrollment_id: enrollment.id,
                    course_title,
                    amount,
                    next_payment_due: enrollment.next_payment_due,
                },
            ),
        )
        .await;
    }

    async fn record(&self, notification: &PaymentNotification, report: &SettlementReport, now: Timestamp) {
        let record = PaymentEventRecord {
            payment_id: notification.payment_id.clone(),
            status: notification.status.as_str().to_string(),
            reference: notification.reference.clone(),
            outcome: report.outcome,
            detail: report.detail.clone(),
            payload: notification.raw.clone(),
            received_at: now,
        };
        match self.events.record(record).await {
            Ok(SaveResult::Inserted) => {}
            Ok(SaveResult::AlreadyExists) => {
                tracing::debug!(payment_id = %notification.payment_id, "Replayed delivery");
            }
            Err(e) => {
                tracing::warn!(
                    payment_id = %notification.payment_id,
                    error = %e,
                    "Payment event not logged"
                );
            }
        }
    }
}

enum Step {
    Done(SettlementReport),
    Retry,
}

/// A failure only counts for the payment currently in flight.
fn is_current_payment(enrollment: &Enrollment, notification: &PaymentNotification) -> bool {
    enrollment.transaction_id.as_deref() == Some(notification.payment_id.as_str())
        || (notification.reference.is_some()
            && enrollment.payment_reference == notification.reference)
}

fn storage(e: DomainError) -> WebhookError {
    WebhookError::Database(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::adapters::notifications::RecordingNotifier;
    use crate::application::handlers::enrollment::test_support::{center, seat_course, shared, user};
    use crate::application::handlers::enrollment::{attach_payment, ClaimSeatCommand, ClaimSeatHandler};
    use crate::domain::capacity::Center;
    use crate::domain::subscription::UserAccount;
    use crate::ports::{CourseSummary, NotificationKind, PaymentSession};
    use axum::http::StatusCode;

    struct Fixture {
        store: InMemoryStore,
        course: CourseSummary,
        center: Center,
        notifier: RecordingNotifier,
        handler: SettlePaymentHandler,
    }

    async fn fixture(capacity: u32) -> Fixture {
        let (store, course, center) = seat_course(capacity).await;
        let notifier = RecordingNotifier::new();
        let handler = SettlePaymentHandler::new(
            shared(&store),
            shared(&store),
            shared(&store),
            shared(&store),
            shared(&store),
            Arc::new(notifier.clone()),
            BillingPolicy::default(),
            SubscriptionPolicy::default(),
        );
        Fixture {
            store,
            course,
            center,
            notifier,
            handler,
        }
    }

    /// Claims a seat and attaches gateway payment `payment_id`.
    async fn pending_payment(f: &Fixture, name: &str, payment_id: &str) -> (Enrollment, String) {
        let claim = ClaimSeatHandler::new(
            shared(&f.store),
            shared(&f.store),
            shared(&f.store),
            BillingPolicy::default(),
        );
        let enrollment = claim
            .handle(ClaimSeatCommand {
                user_id: user(name),
                course_id: f.course.id,
                center_id: f.center.id,
            })
            .await
            .unwrap()
            .enrollment;
        let reference = PaymentReference::seat(&enrollment.id, Timestamp::now()).to_string();
        let session = PaymentSession {
            payment_id: payment_id.to_string(),
            payment_link: None,
        };
        let enrollment = attach_payment(&f.store, enrollment, &session, &reference)
            .await
            .unwrap();
        (enrollment, reference)
    }

    fn delivery(payment_id: &str, status: &str, reference: Option<&str>) -> SettlePaymentCommand {
        let body = serde_json::json!({
            "id": payment_id,
            "status": status,
            "reference": reference,
            "amount": 5000,
        });
        SettlePaymentCommand {
            notification: PaymentNotification::from_body(&serde_json::to_vec(&body).unwrap()).unwrap(),
        }
    }

    async fn stored(store: &InMemoryStore, id: &EnrollmentId) -> Enrollment {
        EnrollmentRepository::find_by_id(store, id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn success_activates_and_credits_once() {
        let f = fixture(2).await;
        let (e, reference) = pending_payment(&f, "ama", "pay_1").await;

        let first = f.handler.handle(delivery("pay_1", "success", Some(&reference))).await.unwrap();
        let second = f.handler.handle(delivery("pay_1", "success", Some(&reference))).await.unwrap();

        assert_eq!(first.outcome, EventOutcome::Applied);
        assert_eq!(first.kind, Some(ActivationKind::Activated));
        assert_eq!(second.outcome, EventOutcome::AlreadyProcessed);

        let saved = stored(&f.store, &e.id).await;
        assert_eq!(saved.status, EnrollmentStatus::Active);
        assert_eq!(saved.settled_payment_id.as_deref(), Some("pay_1"));

        let c = center(&f.store, &f.center.id).await;
        assert_eq!(c.total_earnings, 5000);
        assert_eq!(c.current_enrollment, 1);

        assert_eq!(f.notifier.count_of(NotificationKind::OwnerNotice), 1);
        assert_eq!(f.notifier.count_of(NotificationKind::Receipt), 1);
    }

    #[tokio::test]
    async fn success_is_found_by_reference_when_payment_id_is_unknown() {
        let f = fixture(2).await;
        let (e, reference) = pending_payment(&f, "ama", "pay_1").await;

        let report = f
            .handler
            .handle(delivery("pay_other", "success", Some(&reference)))
            .await
            .unwrap();

        assert_eq!(report.outcome, EventOutcome::Applied);
        assert_eq!(report.enrollment_id, Some(e.id));
    }

    #[tokio::test]
    async fn failure_releases_the_seat() {
        let f = fixture(1).await;
        let (e, reference) = pending_payment(&f, "ama", "pay_1").await;
        assert_eq!(center(&f.store, &f.center.id).await.current_enrollment, 1);

        let report = f.handler.handle(delivery("pay_1", "failed", Some(&reference))).await.unwrap();
        let replay = f.handler.handle(delivery("pay_1", "failed", Some(&reference))).await.unwrap();

        assert_eq!(report.outcome, EventOutcome::Applied);
        assert_eq!(replay.outcome, EventOutcome::AlreadyProcessed);
        assert_eq!(stored(&f.store, &e.id).await.status, EnrollmentStatus::Cancelled);
        assert_eq!(center(&f.store, &f.center.id).await.current_enrollment, 0);

        // The freed seat can be claimed again
        pending_payment(&f, "bola", "pay_2").await;
        assert_eq!(center(&f.store, &f.center.id).await.current_enrollment, 1);
    }

    #[tokio::test]
    async fn canceled_spelling_variants_release_the_seat() {
        let f = fixture(1).await;
        let (e, reference) = pending_payment(&f, "ama", "pay_1").await;

        f.handler.handle(delivery("pay_1", "cancelled", Some(&reference))).await.unwrap();

        assert_eq!(stored(&f.store, &e.id).await.status, EnrollmentStatus::Cancelled);
        assert_eq!(center(&f.store, &f.center.id).await.current_enrollment, 0);
    }

    #[tokio::test]
    async fn failure_on_active_enrollment_changes_nothing() {
        let f = fixture(2).await;
        let (e, reference) = pending_payment(&f, "ama", "pay_1").await;
        f.handler.handle(delivery("pay_1", "success", Some(&reference))).await.unwrap();

        let report = f.handler.handle(delivery("pay_1", "failed", Some(&reference))).await.unwrap();

        assert_eq!(report.outcome, EventOutcome::Ignored);
        assert_eq!(stored(&f.store, &e.id).await.status, EnrollmentStatus::Active);
        assert_eq!(center(&f.store, &f.center.id).await.current_enrollment, 1);
    }

    #[tokio::test]
    async fn late_success_after_failure_reinstates_when_a_seat_is_free() {
        let f = fixture(2).await;
        let (e, reference) = pending_payment(&f, "ama", "pay_1").await;
        f.handler.handle(delivery("pay_1", "failed", Some(&reference))).await.unwrap();

        let report = f.handler.handle(delivery("pay_1", "success", Some(&reference))).await.unwrap();

        assert_eq!(report.outcome, EventOutcome::Applied);
        assert_eq!(report.kind, Some(ActivationKind::Reinstated));
        assert_eq!(stored(&f.store, &e.id).await.status, EnrollmentStatus::Active);
        let c = center(&f.store, &f.center.id).await;
        assert_eq!(c.current_enrollment, 1);
        assert_eq!(c.total_earnings, 5000);
    }

    #[tokio::test]
    async fn late_success_without_a_seat_needs_attention() {
        let f = fixture(1).await;
        let (e, reference) = pending_payment(&f, "ama", "pay_1").await;
        f.handler.handle(delivery("pay_1", "failed", Some(&reference))).await.unwrap();
        pending_payment(&f, "bola", "pay_2").await;

        let report = f.handler.handle(delivery("pay_1", "success", Some(&reference))).await.unwrap();

        assert_eq!(report.outcome, EventOutcome::NeedsAttention);
        assert_eq!(stored(&f.store, &e.id).await.status, EnrollmentStatus::Cancelled);
        let c = center(&f.store, &f.center.id).await;
        assert_eq!(c.current_enrollment, 1);
        assert_eq!(c.total_earnings, 0);
    }

    #[tokio::test]
    async fn pending_status_is_logged_without_transition() {
        let f = fixture(2).await;
        let (e, reference) = pending_payment(&f, "ama", "pay_1").await;

        let report = f.handler.handle(delivery("pay_1", "pending", Some(&reference))).await.unwrap();

        assert_eq!(report.outcome, EventOutcome::Ignored);
        assert_eq!(stored(&f.store, &e.id).await.status, EnrollmentStatus::Pending);
        let logged = PaymentEventLog::find(&f.store, "pay_1", "pending").await.unwrap().unwrap();
        assert_eq!(logged.outcome, EventOutcome::Ignored);
        assert_eq!(logged.payload["status"], "pending");
    }

    #[tokio::test]
    async fn unrecognized_reference_is_ignored() {
        let f = fixture(2).await;
        let (e, _) = pending_payment(&f, "ama", "pay_1").await;

        let report = f
            .handler
            .handle(delivery("pay_1", "success", Some("SHOP_ORDER_42")))
            .await
            .unwrap();

        assert_eq!(report.outcome, EventOutcome::Ignored);
        assert_eq!(stored(&f.store, &e.id).await.status, EnrollmentStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_payment_is_ignored() {
        let f = fixture(2).await;

        let report = f.handler.handle(delivery("pay_404", "success", None)).await.unwrap();

        assert_eq!(report.outcome, EventOutcome::Ignored);
        assert_eq!(f.store.payment_events().await.len(), 1);
    }

    #[tokio::test]
    async fn subscription_payment_extends_once() {
        let f = fixture(2).await;
        let payer = user("kofi");
        let now = Timestamp::now();
        SubscriptionRepository::find_or_create(&f.store, &UserAccount::new(payer.clone(), None, None, now))
            .await
            .unwrap();
        let reference = PaymentReference::subscription(&payer, now).to_string();

        let first = f.handler.handle(delivery("sub_1", "success", Some(&reference))).await.unwrap();
        let second = f.handler.handle(delivery("sub_1", "success", Some(&reference))).await.unwrap();

        assert_eq!(first.outcome, EventOutcome::Applied);
        assert_eq!(second.outcome, EventOutcome::AlreadyProcessed);
        let account = SubscriptionRepository::find(&f.store, &payer).await.unwrap().unwrap();
        let paid_until = account.paid_until.unwrap();
        assert!(paid_until.is_after(&now.plus_days(29)));
        assert!(paid_until.is_before(&now.plus_days(31)));
    }

    #[tokio::test]
    async fn subscription_payment_for_unknown_user_needs_attention() {
        let f = fixture(2).await;
        let reference = PaymentReference::subscription(&user("ghost"), Timestamp::now()).to_string();

        let report = f.handler.handle(delivery("sub_9", "success", Some(&reference))).await.unwrap();

        assert_eq!(report.outcome, EventOutcome::NeedsAttention);
    }

    #[tokio::test]
    async fn storage_failure_is_reported_and_logged() {
        let f = fixture(2).await;
        let (e, reference) = pending_payment(&f, "ama", "pay_1").await;
        f.store.fail_next_commits(1).await;

        let err = f
            .handler
            .handle(delivery("pay_1", "success", Some(&reference)))
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::Database(_)));
        assert_eq!(err.status_code(), StatusCode::OK);
        assert_eq!(stored(&f.store, &e.id).await.status, EnrollmentStatus::Pending);
        assert_eq!(center(&f.store, &f.center.id).await.total_earnings, 0);
        let logged = PaymentEventLog::find(&f.store, "pay_1", "success").await.unwrap().unwrap();
        assert_eq!(logged.outcome, EventOutcome::Failed);
    }
}
