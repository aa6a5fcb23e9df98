//! OverrideCenterHandler - Admin command that moves an enrollment to
//! another center of the same course.

use std::sync::Arc;

use crate::domain::enrollment::{Enrollment, EnrollmentError};
use crate::domain::foundation::{CenterId, EnrollmentId, Timestamp};
use crate::ports::{CenterRepository, EnrollmentRepository};

use super::{commit_update, load, MAX_COMMIT_ATTEMPTS};

#[derive(Debug, Clone)]
pub struct OverrideCenterCommand {
    pub enrollment_id: EnrollmentId,
    pub target_center_id: CenterId,
}

/// Lifts the location lock for one move. A held seat is transferred in the
/// same commit; the target is checked on capacity only.
pub struct OverrideCenterHandler {
    enrollments: Arc<dyn EnrollmentRepository>,
    centers: Arc<dyn CenterRepository>,
}

impl OverrideCenterHandler {
    pub fn new(enrollments: Arc<dyn EnrollmentRepository>, centers: Arc<dyn CenterRepository>) -> Self {
        Self {
            enrollments,
            centers,
        }
    }

    pub async fn handle(&self, cmd: OverrideCenterCommand) -> Result<Enrollment, EnrollmentError> {
        let target = self
            .centers
            .find_by_id(&cmd.target_center_id)
            .await?
            .ok_or_else(|| EnrollmentError::center_not_found(cmd.target_center_id))?;

        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let mut enrollment = load(self.enrollments.as_ref(), &cmd.enrollment_id).await?;
            if enrollment.course_id != target.course_id {
                return Err(EnrollmentError::validation(
                    "center_id",
                    "target center belongs to another course",
                ));
            }
            let version = enrollment.version;
            let from = enrollment.center_id;
            let now = Timestamp::now();
            let effect = enrollment.reassign_center(target.id, now)?;

            if let Some(saved) =
                commit_update(self.enrollments.as_ref(), enrollment, version, effect, now).await?
            {
                tracing::info!(
                    enrollment_id = %saved.id,
                    from = ?from,
                    to = %target.id,
                    "Enrollment moved to another center"
                );
                return Ok(saved);
            }
        }
        Err(EnrollmentError::Conflict(cmd.enrollment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::enrollment::test_support::{
        add_center, center, seat_course, shared, user,
    };
    use crate::application::handlers::enrollment::{ClaimSeatCommand, ClaimSeatHandler};
    use crate::domain::billing::BillingPolicy;
    use crate::domain::foundation::CourseId;

    #[tokio::test]
    async fn move_transfers_the_seat() {
        let (store, course, from) = seat_course(2).await;
        let to = add_center(&store, course.id, 2).await;
        let claim = ClaimSeatHandler::new(shared(&store), shared(&store), shared(&store), BillingPolicy::default());
        let e = claim
            .handle(ClaimSeatCommand { user_id: user("omar"), course_id: course.id, center_id: from.id })
            .await
            .unwrap()
            .enrollment;

        let moved = OverrideCenterHandler::new(shared(&store), shared(&store))
            .handle(OverrideCenterCommand { enrollment_id: e.id, target_center_id: to.id })
            .await
            .unwrap();

        assert_eq!(moved.center_id, Some(to.id));
        assert_eq!(center(&store, &from.id).await.current_enrollment, 0);
        assert_eq!(center(&store, &to.id).await.current_enrollment, 1);
    }

    #[tokio::test]
    async fn full_target_leaves_both_centers_untouched() {
        let (store, course, from) = seat_course(2).await;
        let to = add_center(&store, course.id, 1).await;
        let claim = ClaimSeatHandler::new(shared(&store), shared(&store), shared(&store), BillingPolicy::default());
        let e = claim
            .handle(ClaimSeatCommand { user_id: user("omar"), course_id: course.id, center_id: from.id })
            .await
            .unwrap()
            .enrollment;
        claim
            .handle(ClaimSeatCommand { user_id: user("pia"), course_id: course.id, center_id: to.id })
            .await
            .unwrap();

        let err = OverrideCenterHandler::new(shared(&store), shared(&store))
            .handle(OverrideCenterCommand { enrollment_id: e.id, target_center_id: to.id })
            .await
            .unwrap_err();

        assert_eq!(err, EnrollmentError::capacity_exceeded(to.id));
        assert_eq!(center(&store, &from.id).await.current_enrollment, 1);
        assert_eq!(center(&store, &to.id).await.current_enrollment, 1);
    }

    #[tokio::test]
    async fn target_of_another_course_is_rejected() {
        let (store, course, from) = seat_course(2).await;
        let foreign = add_center(&store, CourseId::new(), 2).await;
        let claim = ClaimSeatHandler::new(shared(&store), shared(&store), shared(&store), BillingPolicy::default());
        let e = claim
            .handle(ClaimSeatCommand { user_id: user("omar"), course_id: course.id, center_id: from.id })
            .await
            .unwrap()
            .enrollment;

        let err = OverrideCenterHandler::new(shared(&store), shared(&store))
            .handle(OverrideCenterCommand { enrollment_id: e.id, target_center_id: foreign.id })
            .await
            .unwrap_err();

        assert!(matches!(err, EnrollmentError::ValidationFailed { .. }));
    }
}
