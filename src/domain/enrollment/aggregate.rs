//! Enrollment aggregate entity.
//!
//! One record per (user, course). Re-enrollment updates the record in place.
//! Every mutating method returns the [`LedgerEffect`] that must be persisted
//! together with the new state.

use serde::{Deserialize, Serialize};

use crate::domain::billing::{BillingPolicy, Enforcement, ObligationPhase, RecurringObligation};
use crate::domain::foundation::{
    CenterId, CourseId, EnrollmentId, StateMachine, Timestamp, UserId,
};

use super::{EnrollmentError, EnrollmentStatus, LedgerEffect};

/// How a confirmed payment changed the enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    /// Pending became Active.
    Activated,
    /// Active enrollment paid for another period.
    Renewed,
    /// Cancelled enrollment came back after a late payment.
    Reinstated,
    /// This payment was already applied.
    AlreadyProcessed,
}

/// Result of applying a confirmed payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub kind: ActivationKind,
    pub effect: LedgerEffect,
}

/// Enrollment aggregate.
///
/// # Invariants
///
/// - at most one per (user_id, course_id)
/// - `center_id` only changes through [`Enrollment::reassign_center`]
/// - `next_payment_due` is only set for center-backed enrollments
/// - `ejection_count` never decreases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub center_id: Option<CenterId>,
    pub status: EnrollmentStatus,

    /// Amount charged per period, in currency units.
    pub amount: i64,

    /// Gateway payment id of the payment currently in flight.
    pub transaction_id: Option<String>,

    /// Reference sent to the gateway with that payment.
    pub payment_reference: Option<String>,

    /// Gateway payment id of the last payment applied.
    pub settled_payment_id: Option<String>,

    pub next_payment_due: Option<Timestamp>,
    pub paid_at: Option<Timestamp>,
    pub warning_email_sent: bool,
    pub is_ejected: bool,
    pub ejection_count: u32,
    pub ejected_at: Option<Timestamp>,

    /// Optimistic concurrency token, bumped by the store on every write.
    pub version: i32,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Enrollment {
    /// Creates a Pending seat claim at a center.
    pub fn claim(
        id: EnrollmentId,
        user_id: UserId,
        course_id: CourseId,
        center_id: CenterId,
        amount: i64,
        now: Timestamp,
        policy: &BillingPolicy,
    ) -> (Self, LedgerEffect) {
        let enrollment = Self {
            id,
            user_id,
            course_id,
            center_id: Some(center_id),
            status: EnrollmentStatus::Pending,
            amount,
            transaction_id: None,
            payment_reference: None,
            settled_payment_id: None,
            next_payment_due: Some(policy.next_due(now)),
            paid_at: None,
            warning_email_sent: false,
            is_ejected: false,
            ejection_count: 0,
            ejected_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        (enrollment, LedgerEffect::Reserve { center_id })
    }

    /// Creates a Pending purchase of a course without centers.
    pub fn start_purchase(
        id: EnrollmentId,
        user_id: UserId,
        course_id: CourseId,
        amount: i64,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            course_id,
            center_id: None,
            status: EnrollmentStatus::Pending,
            amount,
            transaction_id: None,
            payment_reference: None,
            settled_payment_id: None,
            next_payment_due: None,
            paid_at: None,
            warning_email_sent: false,
            is_ejected: false,
            ejection_count: 0,
            ejected_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Claims the seat again on a Cancelled record. The record stays bound
    /// to its original center.
    pub fn reclaim(
        &mut self,
        center_id: CenterId,
        amount: i64,
        now: Timestamp,
        policy: &BillingPolicy,
    ) -> Result<LedgerEffect, EnrollmentError> {
        match self.center_id {
            Some(bound) if bound != center_id => {
                return Err(EnrollmentError::location_locked(bound));
            }
            None => {
                return Err(EnrollmentError::invalid_state(
                    "purchase",
                    "claim a seat on",
                ))
            }
            _ => {}
        }
        if self.status != EnrollmentStatus::Cancelled {
            return Err(EnrollmentError::invalid_state(
                self.status.as_str(),
                "re-claim",
            ));
        }
        self.transition_to(EnrollmentStatus::Pending)?;
        self.amount = amount;
        self.transaction_id = None;
        self.payment_reference = None;
        self.next_payment_due = Some(policy.next_due(now));
        self.warning_email_sent = false;
        // Holds a seat again, so the sweep must be able to take it back
        self.is_ejected = false;
        self.updated_at = now;
        Ok(LedgerEffect::Reserve { center_id })
    }

    /// Resets a non-Active purchase to Pending for a new payment attempt.
    pub fn restart_purchase(&mut self, amount: i64, now: Timestamp) -> Result<(), EnrollmentError> {
        if self.status == EnrollmentStatus::Active {
            return Err(EnrollmentError::already_enrolled(self.course_id));
        }
        if self.center_id.is_some() {
            return Err(EnrollmentError::invalid_state(
                "seat claim",
                "restart a purchase on",
            ));
        }
        self.transition_to(EnrollmentStatus::Pending)?;
        self.amount = amount;
        self.transaction_id = None;
        self.payment_reference = None;
        self.updated_at = now;
        Ok(())
    }

    /// Records the payment just initiated with the gateway.
    ///
    /// Allowed while Pending, for an Active seat paying its next period, and
    /// for ejected Cancelled enrollments paying their way back in. An Active
    /// purchase without a center has nothing left to pay.
    pub fn attach_payment(
        &mut self,
        transaction_id: impl Into<String>,
        reference: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), EnrollmentError> {
        match (self.status, self.center_id) {
            (EnrollmentStatus::Active, None) => {
                return Err(EnrollmentError::already_active(self.id))
            }
            (EnrollmentStatus::Cancelled, _) if !self.is_ejected => {
                return Err(EnrollmentError::invalid_state("cancelled", "pay for"));
            }
            _ => {}
        }
        self.transaction_id = Some(transaction_id.into());
        self.payment_reference = Some(reference.into());
        self.updated_at = now;
        Ok(())
    }

    /// Applies a confirmed payment identified by `payment_id`.
    ///
    /// `credited` is what the owning center earns from it.
    pub fn activate(
        &mut self,
        payment_id: &str,
        credited: i64,
        now: Timestamp,
        policy: &BillingPolicy,
    ) -> Result<Activation, EnrollmentError> {
        if self.settled_payment_id.as_deref() == Some(payment_id) {
            return Ok(Activation {
                kind: ActivationKind::AlreadyProcessed,
                effect: LedgerEffect::None,
            });
        }

        let (kind, effect) = match (self.status, self.center_id) {
            (EnrollmentStatus::Active, None) => {
                return Ok(Activation {
                    kind: ActivationKind::AlreadyProcessed,
                    effect: LedgerEffect::None,
                });
            }
            (EnrollmentStatus::Active, Some(center_id)) => {
                let from = self.next_payment_due.map(|due| due.latest(now)).unwrap_or(now);
                self.next_payment_due = Some(policy.next_due(from));
                (
                    ActivationKind::Renewed,
                    LedgerEffect::Credit {
                        center_id,
                        amount: credited,
                    },
                )
            }
            (EnrollmentStatus::Pending, center) => {
                self.next_payment_due = center.map(|_| policy.next_due(now));
                let effect = match center {
                    Some(center_id) => LedgerEffect::Credit {
                        center_id,
                        amount: credited,
                    },
                    None => LedgerEffect::None,
                };
                (ActivationKind::Activated, effect)
            }
            (EnrollmentStatus::Cancelled, center) => {
                self.next_payment_due = center.map(|_| policy.next_due(now));
                let effect = match center {
                    Some(center_id) => LedgerEffect::RestoreAndCredit {
                        center_id,
                        amount: credited,
                    },
                    None => LedgerEffect::None,
                };
                (ActivationKind::Reinstated, effect)
            }
        };

        self.transition_to(EnrollmentStatus::Active)?;
        self.paid_at = Some(now);
        self.settled_payment_id = Some(payment_id.to_string());
        self.is_ejected = false;
        self.warning_email_sent = false;
        self.updated_at = now;
        Ok(Activation { kind, effect })
    }

    /// Applies a failed or cancelled payment. Returns `None` when there is
    /// nothing to do (already Cancelled, or a failed renewal on an Active
    /// enrollment).
    pub fn cancel_on_failure(&mut self, now: Timestamp) -> Result<Option<LedgerEffect>, EnrollmentError> {
        if self.status != EnrollmentStatus::Pending {
            return Ok(None);
        }
        self.transition_to(EnrollmentStatus::Cancelled)?;
        self.updated_at = now;
        Ok(Some(self.release_effect()))
    }

    /// Ejects an overdue paying holder.
    pub fn eject(&mut self, now: Timestamp) -> Result<LedgerEffect, EnrollmentError> {
        if self.status != EnrollmentStatus::Active || !self.needs_enforcement(now) {
            return Err(EnrollmentError::invalid_state(
                self.status.as_str(),
                "eject a non-overdue",
            ));
        }
        self.apply_ejection(now)
    }

    /// Cancels an unpaid claim whose due date passed and frees its seat.
    /// Not an ejection: the holder never paid, so nothing is recorded
    /// against them and they may claim again.
    pub fn lapse(&mut self, now: Timestamp) -> Result<LedgerEffect, EnrollmentError> {
        if self.status != EnrollmentStatus::Pending || !self.needs_enforcement(now) {
            return Err(EnrollmentError::invalid_state(
                self.status.as_str(),
                "lapse a non-overdue",
            ));
        }
        self.transition_to(EnrollmentStatus::Cancelled)?;
        self.updated_at = now;
        Ok(self.release_effect())
    }

    /// Ejects an Active holder regardless of the due date.
    pub fn eject_by_admin(&mut self, now: Timestamp) -> Result<LedgerEffect, EnrollmentError> {
        if self.status != EnrollmentStatus::Active || self.is_ejected {
            return Err(EnrollmentError::invalid_state(self.status.as_str(), "eject"));
        }
        self.apply_ejection(now)
    }

    /// Reactivates an ejected enrollment without a payment and starts a
    /// fresh billing period.
    pub fn unlock(&mut self, now: Timestamp, policy: &BillingPolicy) -> Result<LedgerEffect, EnrollmentError> {
        if self.status == EnrollmentStatus::Active {
            return Err(EnrollmentError::already_active(self.id));
        }
        if !self.is_ejected {
            return Err(EnrollmentError::not_ejected(self.id));
        }
        let effect = match (self.status.holds_seat(), self.center_id) {
            (false, Some(center_id)) => LedgerEffect::Restore { center_id },
            _ => LedgerEffect::None,
        };
        self.transition_to(EnrollmentStatus::Active)?;
        self.is_ejected = false;
        self.warning_email_sent = false;
        self.next_payment_due = self.center_id.map(|_| policy.next_due(now));
        self.updated_at = now;
        Ok(effect)
    }

    /// Moves the enrollment to another center of the same course.
    pub fn reassign_center(&mut self, target: CenterId, now: Timestamp) -> Result<LedgerEffect, EnrollmentError> {
        let Some(current) = self.center_id else {
            return Err(EnrollmentError::invalid_state("purchase", "move"));
        };
        if current == target {
            return Err(EnrollmentError::validation(
                "center_id",
                "enrollment is already at this center",
            ));
        }
        self.center_id = Some(target);
        self.updated_at = now;
        if self.status.holds_seat() {
            Ok(LedgerEffect::Transfer {
                from: current,
                to: target,
            })
        } else {
            Ok(LedgerEffect::None)
        }
    }

    /// Marks the payment warning for the current due date as sent.
    pub fn mark_warning_sent(&mut self, now: Timestamp) {
        self.warning_email_sent = true;
        self.updated_at = now;
    }

    /// Whether the ejected holder is still inside the re-enrollment window.
    pub fn can_re_enroll(&self, now: Timestamp, policy: &BillingPolicy) -> bool {
        match (self.is_ejected, self.ejected_at) {
            (true, Some(ejected_at)) => {
                i64::from(ejected_at.days_elapsed_floor(&now)) < policy.grace_days
            }
            _ => false,
        }
    }

    /// Whole days past the due date, 0 when not overdue.
    pub fn days_overdue(&self, now: Timestamp) -> u32 {
        self.next_payment_due
            .map(|due| due.days_elapsed_floor(&now))
            .unwrap_or(0)
    }

    /// Whether the enrollment occupies a seat at its center.
    pub fn holds_seat(&self) -> bool {
        self.center_id.is_some() && self.status.holds_seat()
    }

    /// Whether the enrollment belongs to `user_id`.
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    fn apply_ejection(&mut self, now: Timestamp) -> Result<LedgerEffect, EnrollmentError> {
        self.transition_to(EnrollmentStatus::Cancelled)?;
        self.is_ejected = true;
        self.ejection_count += 1;
        self.ejected_at = Some(now);
        self.updated_at = now;
        Ok(self.release_effect())
    }

    fn release_effect(&self) -> LedgerEffect {
        match self.center_id {
            Some(center_id) => LedgerEffect::Release { center_id },
            None => LedgerEffect::None,
        }
    }

    fn transition_to(&mut self, target: EnrollmentStatus) -> Result<(), EnrollmentError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            EnrollmentError::invalid_state(self.status.as_str(), format!("move to {}", target))
        })?;
        Ok(())
    }
}

impl RecurringObligation for Enrollment {
    const ENFORCEMENT: Enforcement = Enforcement::EjectFromSeat;

    /// A seat is tracked while it is held, paid or not: an unpaid claim
    /// past its due date lapses, a paid one is ejected.
    fn due_at(&self) -> Option<Timestamp> {
        if self.holds_seat() {
            self.next_payment_due
        } else {
            None
        }
    }

    fn warned(&self) -> bool {
        self.warning_email_sent
    }

    fn enforced(&self) -> bool {
        self.is_ejected
    }

    /// Only Active holders are warned; a Pending claim has a payment link
    /// from the moment it was made.
    fn needs_warning(&self, now: Timestamp, policy: &BillingPolicy) -> bool {
        self.status == EnrollmentStatus::Active
            && !self.enforced()
            && !self.warned()
            && matches!(self.phase(now, policy), ObligationPhase::DueSoon { .. })
    }
}
