//! Enrollment handlers.
//!
//! ## Commands
//! - Claiming a seat at a center
//! - Buying a conventional course
//! - Starting (or restarting) a payment
//! - Admin: unlock, eject, move to another center, record a manual payment
//!
//! ## Queries
//! - Payment status poll
//! - Enrollment details for its owner
//!
//! Writes go through `EnrollmentRepository::commit`. A `Conflict` means the
//! record changed since it was read: handlers re-read, decide again, and
//! give up after `MAX_COMMIT_ATTEMPTS`.

mod claim_seat;
mod eject_enrollment;
mod enroll_in_course;
mod get_enrollment;
mod get_payment_status;
mod initiate_payment;
mod override_center;
mod record_manual_payment;
mod unlock_enrollment;

// Commands
pub use claim_seat::{ClaimSeatCommand, ClaimSeatHandler, ClaimSeatResult};
pub use eject_enrollment::{EjectEnrollmentCommand, EjectEnrollmentHandler};
pub use enroll_in_course::{EnrollInCourseCommand, EnrollInCourseHandler, EnrollInCourseResult};
pub use initiate_payment::{InitiatePaymentCommand, InitiatePaymentHandler, InitiatePaymentResult};
pub use override_center::{OverrideCenterCommand, OverrideCenterHandler};
pub use record_manual_payment::{
    RecordManualPaymentCommand, RecordManualPaymentHandler, RecordManualPaymentResult,
};
pub use unlock_enrollment::{UnlockEnrollmentCommand, UnlockEnrollmentHandler};

// Queries
pub use get_enrollment::{EnrollmentView, GetEnrollmentHandler, GetEnrollmentQuery};
pub use get_payment_status::{GetPaymentStatusHandler, GetPaymentStatusQuery, PaymentStatusView};

use crate::domain::billing::BillingPolicy;
use crate::domain::enrollment::{Enrollment, EnrollmentError, LedgerEffect};
use crate::domain::foundation::{EnrollmentId, Timestamp};
use crate::ports::{
    enrollment_pay_path, CommitOutcome, EnrollmentChange, EnrollmentRepository, Notification,
    NotificationPayload, PaymentSession, Recipient,
};

/// Attempts per command before a `Conflict` is reported to the caller.
pub(crate) const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Loads an enrollment or fails with `NotFound`.
pub(crate) async fn load(
    repo: &dyn EnrollmentRepository,
    id: &EnrollmentId,
) -> Result<Enrollment, EnrollmentError> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| EnrollmentError::not_found(*id))
}

/// Commits `enrollment` read at `version`. A refused seat is reported as
/// `CapacityExceeded`; `None` means the record changed and the caller
/// should re-read.
pub(crate) async fn commit_update(
    repo: &dyn EnrollmentRepository,
    enrollment: Enrollment,
    version: i32,
    effect: LedgerEffect,
    now: Timestamp,
) -> Result<Option<Enrollment>, EnrollmentError> {
    let id = enrollment.id;
    match repo
        .commit(EnrollmentChange::update(enrollment, version, effect, now))
        .await?
    {
        CommitOutcome::Applied(saved) => Ok(Some(saved)),
        CommitOutcome::Conflict => {
            tracing::debug!(enrollment_id = %id, "Enrollment changed concurrently, retrying");
            Ok(None)
        }
        CommitOutcome::SeatUnavailable { center_id } => {
            Err(EnrollmentError::capacity_exceeded(center_id))
        }
    }
}

/// Stores the gateway payment just started on the enrollment.
pub(crate) async fn attach_payment(
    repo: &dyn EnrollmentRepository,
    mut enrollment: Enrollment,
    session: &PaymentSession,
    reference: &str,
) -> Result<Enrollment, EnrollmentError> {
    for _ in 0..MAX_COMMIT_ATTEMPTS {
        let now = Timestamp::now();
        let version = enrollment.version;
        let mut next = enrollment.clone();
        next.attach_payment(session.payment_id.clone(), reference, now)?;

        if let Some(saved) = commit_update(repo, next, version, LedgerEffect::None, now).await? {
            return Ok(saved);
        }
        enrollment = load(repo, &enrollment.id).await?;
    }
    Err(EnrollmentError::Conflict(enrollment.id))
}

/// Ejection notice sent to the student.
pub(crate) fn ejection_notice(
    enrollment: &Enrollment,
    now: Timestamp,
    policy: &BillingPolicy,
) -> Notification {
    Notification::new(
        Recipient::User(enrollment.user_id.clone()),
        NotificationPayload::EjectionNotice {
            enrollment_id: enrollment.id,
            days_overdue: enrollment.days_overdue(now),
            re_enrollment_deadline: policy.grace_deadline(now),
            amount_due: enrollment.amount,
            pay_path: enrollment_pay_path(&enrollment.id),
        },
    )
}

/// Checks a Cameroonian mobile-money number: `237`, then 6 or 7, then
/// eight digits.
pub(crate) fn validate_phone(raw: &str) -> Result<String, EnrollmentError> {
    let phone = raw.trim();
    let bytes = phone.as_bytes();
    let valid = bytes.len() == 12
        && phone.starts_with("237")
        && matches!(bytes[3], b'6' | b'7')
        && bytes.iter().all(u8::is_ascii_digit);

    if !valid {
        return Err(EnrollmentError::validation(
            "phone_number",
            "must look like 2376XXXXXXXX or 2377XXXXXXXX",
        ));
    }
    Ok(phone.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::adapters::memory::InMemoryStore;
    use crate::domain::capacity::Center;
    use crate::domain::foundation::{CenterId, CourseId, Timestamp, UserId};
    use crate::ports::{CenterRepository, CourseSummary};

    /// A store holding one center-backed course and one center.
    pub(crate) async fn seat_course(capacity: u32) -> (InMemoryStore, CourseSummary, Center) {
        let store = InMemoryStore::new();
        let course = CourseSummary {
            id: CourseId::new(),
            title: "Electronics Lab".to_string(),
            slug: "electronics-lab".to_string(),
            price: 5000,
            center_based: true,
        };
        store.insert_course(course.clone()).await;
        let center = add_center(&store, course.id, capacity).await;
        (store, course, center)
    }

    pub(crate) async fn add_center(store: &InMemoryStore, course_id: CourseId, capacity: u32) -> Center {
        let center = Center::create(
            CenterId::new(),
            course_id,
            "Makepe Center",
            capacity,
            "237690000000",
            None,
            Timestamp::now(),
        )
        .unwrap();
        CenterRepository::insert(store, &center).await.unwrap();
        center
    }

    pub(crate) async fn center(store: &InMemoryStore, id: &CenterId) -> Center {
        CenterRepository::find_by_id(store, id).await.unwrap().unwrap()
    }

    pub(crate) fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    pub(crate) fn shared(store: &InMemoryStore) -> Arc<InMemoryStore> {
        Arc::new(store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_mtn_and_orange_numbers() {
        assert_eq!(validate_phone(" 237670000000 ").unwrap(), "237670000000");
        assert!(validate_phone("237690000000").is_ok());
    }

    #[test]
    fn rejects_malformed_numbers() {
        for bad in ["23767000000", "2376700000001", "237570000000", "+23767000000", "23767000000a"] {
            assert!(validate_phone(bad).is_err(), "{} should be rejected", bad);
        }
    }
}
