//! UnlockEnrollmentHandler - Admin command that reinstates an ejected
//! enrollment without a payment.

use std::sync::Arc;

use crate::domain::billing::BillingPolicy;
use crate::domain::enrollment::{Enrollment, EnrollmentError};
use crate::domain::foundation::{EnrollmentId, Timestamp};
use crate::ports::EnrollmentRepository;

use super::{commit_update, load, MAX_COMMIT_ATTEMPTS};

#[derive(Debug, Clone)]
pub struct UnlockEnrollmentCommand {
    pub enrollment_id: EnrollmentId,
}

/// Reactivates an ejected enrollment for a fresh billing period.
///
/// The seat is taken again on capacity alone; when the center filled up in
/// the meantime the unlock fails with `CapacityExceeded` and nothing changes.
pub struct UnlockEnrollmentHandler {
    enrollments: Arc<dyn EnrollmentRepository>,
    policy: BillingPolicy,
}

impl UnlockEnrollmentHandler {
    pub fn new(enrollments: Arc<dyn EnrollmentRepository>, policy: BillingPolicy) -> Self {
        Self {
            enrollments,
            policy,
        }
    }

    pub async fn handle(&self, cmd: UnlockEnrollmentCommand) -> Result<Enrollment, EnrollmentError> {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let mut enrollment = load(self.enrollments.as_ref(), &cmd.enrollment_id).await?;
            let version = enrollment.version;
            let now = Timestamp::now();
            let effect = enrollment.unlock(now, &self.policy)?;

            if let Some(saved) =
                commit_update(self.enrollments.as_ref(), enrollment, version, effect, now).await?
            {
                tracing::info!(enrollment_id = %saved.id, "Enrollment unlocked");
                return Ok(saved);
            }
        }
        Err(EnrollmentError::Conflict(cmd.enrollment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::application::handlers::enrollment::test_support::{center, seat_course, shared, user};
    use crate::domain::capacity::Center;
    use crate::domain::enrollment::{EnrollmentStatus, LedgerEffect};
    use crate::ports::EnrollmentChange;

    /// Commits an Active enrollment at `center` and ejects it through the
    /// store, so the seat is released.
    async fn ejected(store: &InMemoryStore, center: &Center, who: &str) -> Enrollment {
        let policy = BillingPolicy::default();
        let start = Timestamp::now().minus_days(40);
        let (mut e, effect) =
            Enrollment::claim(EnrollmentId::new(), user(who), center.course_id, center.id, 5000, start, &policy);
        e.activate("pay", 5000, start, &policy).unwrap();
        let e = match store.commit(EnrollmentChange::insert(e, effect, start)).await.unwrap() {
            crate::ports::CommitOutcome::Applied(e) => e,
            other => panic!("unexpected {:?}", other),
        };
        let version = e.version;
        let mut e = e;
        let now = Timestamp::now();
        let release = e.eject(now).unwrap();
        match store.commit(EnrollmentChange::update(e, version, release, now)).await.unwrap() {
            crate::ports::CommitOutcome::Applied(e) => e,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn unlock_restores_seat_and_grants_fresh_period() {
        let (store, _course, c) = seat_course(1).await;
        let e = ejected(&store, &c, "ivy").await;
        assert_eq!(center(&store, &c.id).await.current_enrollment, 0);

        let unlocked = UnlockEnrollmentHandler::new(shared(&store), BillingPolicy::default())
            .handle(UnlockEnrollmentCommand { enrollment_id: e.id })
            .await
            .unwrap();

        assert_eq!(unlocked.status, EnrollmentStatus::Active);
        assert!(!unlocked.is_ejected);
        assert_eq!(unlocked.ejection_count, 1);
        assert!(unlocked.next_payment_due.unwrap().is_after(&Timestamp::now().plus_days(29)));
        assert_eq!(center(&store, &c.id).await.current_enrollment, 1);
    }

    #[tokio::test]
    async fn unlock_fails_when_seat_was_taken() {
        let (store, course, c) = seat_course(1).await;
        let e = ejected(&store, &c, "ivy").await;
        let now = Timestamp::now();
        let (other, reserve) = Enrollment::claim(
            EnrollmentId::new(),
            user("jack"),
            course.id,
            c.id,
            5000,
            now,
            &BillingPolicy::default(),
        );
        store.commit(EnrollmentChange::insert(other, reserve, now)).await.unwrap();

        let err = UnlockEnrollmentHandler::new(shared(&store), BillingPolicy::default())
            .handle(UnlockEnrollmentCommand { enrollment_id: e.id })
            .await
            .unwrap_err();

        assert_eq!(err, EnrollmentError::capacity_exceeded(c.id));
        let stored = store.find_by_id(&e.id).await.unwrap().unwrap();
        assert!(stored.is_ejected);
        assert_eq!(center(&store, &c.id).await.current_enrollment, 1);
    }

    #[tokio::test]
    async fn never_ejected_is_rejected() {
        let (store, course, c) = seat_course(1).await;
        let now = Timestamp::now();
        let (mut e, _) = Enrollment::claim(
            EnrollmentId::new(),
            user("kim"),
            course.id,
            c.id,
            5000,
            now,
            &BillingPolicy::default(),
        );
        e.cancel_on_failure(now).unwrap();
        store.commit(EnrollmentChange::insert(e.clone(), LedgerEffect::None, now)).await.unwrap();

        let err = UnlockEnrollmentHandler::new(shared(&store), BillingPolicy::default())
            .handle(UnlockEnrollmentCommand { enrollment_id: e.id })
            .await
            .unwrap_err();

        assert_eq!(err, EnrollmentError::not_ejected(e.id));
    }
}
