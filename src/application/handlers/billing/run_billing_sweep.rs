//! RunBillingSweepHandler - Periodic warn/eject pass over recurring payments.
//!
//! Three passes, in order:
//!
//! 1. seat warnings for Active enrollments due within the warning window
//! 2. overdue seats: paid holders are ejected, unpaid claims lapse; both
//!    free the seat
//! 3. subscription expiry warnings
//!
//! Each candidate is processed on its own; one failure is counted and
//! logged without stopping the others. Running the sweep again right away
//! does nothing: warned records carry a marker and ejected ones no longer
//! match.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::domain::billing::{BillingPolicy, RecurringObligation};
use crate::domain::enrollment::{Enrollment, EnrollmentError, EnrollmentStatus, LedgerEffect};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::subscription::{SubscriptionPolicy, UserAccount};
use crate::ports::{
    enrollment_pay_path, EnrollmentRepository, Notification, NotificationPayload, Notifier,
    Recipient, SubscriptionRepository,
};

use crate::application::handlers::enrollment::{
    commit_update, ejection_notice, load, MAX_COMMIT_ATTEMPTS,
};
use crate::application::handlers::notify::send_best_effort;

/// Command to run one sweep.
#[derive(Debug, Clone, Default)]
pub struct RunBillingSweepCommand {
    /// Clock to sweep at; the current time when unset.
    pub as_of: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeatSweepCounts {
    pub warned: u32,
    pub ejected: u32,
    /// Unpaid claims cancelled after their due date.
    pub lapsed: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionSweepCounts {
    pub warned: u32,
    pub failed: u32,
}

/// Counts per pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingSweepResult {
    pub seat: SeatSweepCounts,
    pub subscription: SubscriptionSweepCounts,
    pub ran_at: Timestamp,
}

/// Per-candidate result.
enum ItemOutcome {
    Done,
    Lapsed,
    Skipped,
    Failed,
}

pub struct RunBillingSweepHandler {
    enrollments: Arc<dyn EnrollmentRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    notifier: Arc<dyn Notifier>,
    billing: BillingPolicy,
    subscription: SubscriptionPolicy,
}

impl RunBillingSweepHandler {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        notifier: Arc<dyn Notifier>,
        billing: BillingPolicy,
        subscription: SubscriptionPolicy,
    ) -> Self {
        Self {
            enrollments,
            subscriptions,
            notifier,
            billing,
            subscription,
        }
    }

    /// Runs all passes.
    ///
    /// # Errors
    ///
    /// Only the candidate queries can fail the sweep; per-item failures are
    /// counted in the result.
    pub async fn handle(&self, cmd: RunBillingSweepCommand) -> Result<BillingSweepResult, DomainError> {
        let now = cmd.as_of.unwrap_or_else(Timestamp::now);
        let mut seat = SeatSweepCounts::default();
        let mut subscription = SubscriptionSweepCounts::default();

        let due_soon = self
            .enrollments
            .find_due_for_warning(now, self.billing.warning_horizon(now))
            .await?;
        for outcome in join_all(due_soon.into_iter().map(|e| self.warn_seat(e, now))).await {
            match outcome {
                ItemOutcome::Done => seat.warned += 1,
                ItemOutcome::Lapsed | ItemOutcome::Skipped => {}
                ItemOutcome::Failed => seat.failed += 1,
            }
        }

        let overdue = self.enrollments.find_overdue(now).await?;
        for outcome in join_all(overdue.into_iter().map(|e| self.reclaim_seat(e, now))).await {
            match outcome {
                ItemOutcome::Done => seat.ejected += 1,
                ItemOutcome::Lapsed => seat.lapsed += 1,
                ItemOutcome::Skipped => {}
                ItemOutcome::Failed => seat.failed += 1,
            }
        }

        let expiring = self
            .subscriptions
            .find_expiring(now, self.subscription.billing.warning_horizon(now))
            .await?;
        for outcome in join_all(expiring.into_iter().map(|a| self.warn_subscriber(a, now))).await {
            match outcome {
                ItemOutcome::Done => subscription.warned += 1,
                ItemOutcome::Lapsed | ItemOutcome::Skipped => {}
                ItemOutcome::Failed => subscription.failed += 1,
            }
        }

        tracing::info!(
            ran_at = %now,
            seat_warned = seat.warned,
            seat_ejected = seat.ejected,
            seat_lapsed = seat.lapsed,
            seat_failed = seat.failed,
            subscription_warned = subscription.warned,
            subscription_failed = subscription.failed,
            "Billing sweep finished"
        );

        Ok(BillingSweepResult {
            seat,
            subscription,
            ran_at: now,
        })
    }

    async fn warn_seat(&self, enrollment: Enrollment, now: Timestamp) -> ItemOutcome {
        let id = enrollment.id;
        match self.try_warn_seat(enrollment, now).await {
            Ok(Some(saved)) => {
                let Some(due_at) = saved.next_payment_due else {
                    return ItemOutcome::Done;
                };
                send_best_effort(
                    self.notifier.as_ref(),
                    Notification::new(
                        Recipient::User(saved.user_id.clone()),
                        NotificationPayload::PaymentWarning {
                            enrollment_id: saved.id,
                            days_remaining: due_at.days_until_ceil(&now),
                            due_at,
                            amount: saved.amount,
                            pay_path: enrollment_pay_path(&saved.id),
                        },
                    ),
                )
                .await;
                ItemOutcome::Done
            }
            Ok(None) => ItemOutcome::Skipped,
            Err(e) => {
                tracing::error!(enrollment_id = %id, error = %e, "Payment warning failed");
                ItemOutcome::Failed
            }
        }
    }

    /// Sets the warning marker. `None` when the enrollment no longer needs
    /// a warning.
    async fn try_warn_seat(
        &self,
        mut enrollment: Enrollment,
        now: Timestamp,
    ) -> Result<Option<Enrollment>, EnrollmentError> {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            if !enrollment.needs_warning(now, &self.billing) {
                return Ok(None);
            }
            let version = enrollment.version;
            let mut next = enrollment.clone();
            next.mark_warning_sent(now);

            if let Some(saved) =
                commit_update(self.enrollments.as_ref(), next, version, LedgerEffect::None, now)
                    .await?
            {
                return Ok(Some(saved));
            }
            enrollment = load(self.enrollments.as_ref(), &enrollment.id).await?;
        }
        Err(EnrollmentError::Conflict(enrollment.id))
    }

    async fn reclaim_seat(&self, enrollment: Enrollment, now: Timestamp) -> ItemOutcome {
        let id = enrollment.id;
        match self.try_reclaim_seat(enrollment, now).await {
            Ok(Some(saved)) if saved.is_ejected => {
                tracing::info!(
                    enrollment_id = %saved.id,
                    days_overdue = saved.days_overdue(now),
                    "Enrollment ejected for missed payment"
                );
                send_best_effort(
                    self.notifier.as_ref(),
                    ejection_notice(&saved, now, &self.billing),
                )
                .await;
                ItemOutcome::Done
            }
            Ok(Some(saved)) => {
                tracing::info!(enrollment_id = %saved.id, "Unpaid claim lapsed");
                ItemOutcome::Lapsed
            }
            Ok(None) => ItemOutcome::Skipped,
            Err(e) => {
                tracing::error!(enrollment_id = %id, error = %e, "Reclaiming overdue seat failed");
                ItemOutcome::Failed
            }
        }
    }

    /// Ejects a paid holder or lapses an unpaid claim. `None` when the seat
    /// is no longer overdue.
    async fn try_reclaim_seat(
        &self,
        mut enrollment: Enrollment,
        now: Timestamp,
    ) -> Result<Option<Enrollment>, EnrollmentError> {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            if !enrollment.needs_enforcement(now) {
                return Ok(None);
            }
            let version = enrollment.version;
            let mut next = enrollment.clone();
            let effect = match next.status {
                EnrollmentStatus::Pending => next.lapse(now)?,
                _ => next.eject(now)?,
            };

            if let Some(saved) =
                commit_update(self.enrollments.as_ref(), next, version, effect, now).await?
            {
                return Ok(Some(saved));
            }
            enrollment = load(self.enrollments.as_ref(), &enrollment.id).await?;
        }
        Err(EnrollmentError::Conflict(enrollment.id))
    }

    async fn warn_subscriber(&self, account: UserAccount, now: Timestamp) -> ItemOutcome {
        let Some(paid_until) = account.paid_until else {
            return ItemOutcome::Skipped;
        };
        if !account.needs_warning(now, &self.subscription.billing) {
            return ItemOutcome::Skipped;
        }

        match self
            .subscriptions
            .mark_warning_sent(&account.user_id, paid_until)
            .await
        {
            Ok(true) => {
                send_best_effort(
                    self.notifier.as_ref(),
                    Notification::new(
                        Recipient::User(account.user_id.clone()),
                        NotificationPayload::SubscriptionWarning {
                            days_remaining: paid_until.days_until_ceil(&now),
                            paid_until,
                            price: self.subscription.price,
                        },
                    ),
                )
                .await;
                ItemOutcome::Done
            }
            Ok(false) => ItemOutcome::Skipped,
            Err(e) => {
                tracing::error!(user_id = %account.user_id, error = %e, "Subscription warning failed");
                ItemOutcome::Failed
            }
        }
    }
}
