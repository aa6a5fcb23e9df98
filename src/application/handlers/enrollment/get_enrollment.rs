//! GetEnrollmentHandler - Query handler for an enrollment's billing view.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::BillingPolicy;
use crate::domain::enrollment::{Enrollment, EnrollmentError};
use crate::domain::foundation::{EnrollmentId, Timestamp, UserId};
use crate::ports::EnrollmentRepository;

use super::load;

/// Query for one enrollment.
#[derive(Debug, Clone)]
pub struct GetEnrollmentQuery {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
}

/// Enrollment plus derived billing state.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentView {
    pub enrollment: Enrollment,
    pub days_overdue: u32,
    pub can_re_enroll: bool,
    pub re_enrollment_deadline: Option<Timestamp>,
}

pub struct GetEnrollmentHandler {
    enrollments: Arc<dyn EnrollmentRepository>,
    policy: BillingPolicy,
}

impl GetEnrollmentHandler {
    pub fn new(enrollments: Arc<dyn EnrollmentRepository>, policy: BillingPolicy) -> Self {
        Self {
            enrollments,
            policy,
        }
    }

    pub async fn handle(&self, query: GetEnrollmentQuery) -> Result<EnrollmentView, EnrollmentError> {
        let enrollment = load(self.enrollments.as_ref(), &query.enrollment_id).await?;
        if !enrollment.is_owned_by(&query.user_id) {
            return Err(EnrollmentError::NotOwner);
        }

        let now = Timestamp::now();
        Ok(EnrollmentView {
            days_overdue: enrollment.days_overdue(now),
            can_re_enroll: enrollment.can_re_enroll(now, &self.policy),
            re_enrollment_deadline: enrollment
                .ejected_at
                .filter(|_| enrollment.is_ejected)
                .map(|at| self.policy.grace_deadline(at)),
            enrollment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::enrollment::test_support::{seat_course, shared, user};
    use crate::domain::enrollment::LedgerEffect;
    use crate::ports::EnrollmentChange;

    #[tokio::test]
    async fn ejected_enrollment_reports_overdue_and_window() {
        let (store, course, center) = seat_course(2).await;
        let policy = BillingPolicy::default();
        let claimed_at = Timestamp::now().minus_days(45);
        let (mut enrollment, _) = Enrollment::claim(
            EnrollmentId::new(),
            user("gina"),
            course.id,
            center.id,
            course.price,
            claimed_at,
            &policy,
        );
        enrollment.activate("pay_1", course.price, claimed_at, &policy).unwrap();
        let ejected_at = Timestamp::now().minus_days(10);
        enrollment.eject(ejected_at).unwrap();
        store
            .commit(EnrollmentChange::insert(enrollment.clone(), LedgerEffect::None, claimed_at))
            .await
            .unwrap();

        let view = GetEnrollmentHandler::new(shared(&store), policy)
            .handle(GetEnrollmentQuery {
                enrollment_id: enrollment.id,
                user_id: user("gina"),
            })
            .await
            .unwrap();

        assert_eq!(view.days_overdue, 15);
        assert!(view.can_re_enroll);
        assert_eq!(view.re_enrollment_deadline, Some(policy.grace_deadline(ejected_at)));
    }

    #[tokio::test]
    async fn other_users_are_refused() {
        let (store, course, center) = seat_course(2).await;
        let now = Timestamp::now();
        let (enrollment, effect) = Enrollment::claim(
            EnrollmentId::new(),
            user("gina"),
            course.id,
            center.id,
            course.price,
            now,
            &BillingPolicy::default(),
        );
        store
            .commit(EnrollmentChange::insert(enrollment.clone(), effect, now))
            .await
            .unwrap();

        let err = GetEnrollmentHandler::new(shared(&store), BillingPolicy::default())
            .handle(GetEnrollmentQuery {
                enrollment_id: enrollment.id,
                user_id: user("henry"),
            })
            .await
            .unwrap_err();

        assert_eq!(err, EnrollmentError::NotOwner);
    }
}
