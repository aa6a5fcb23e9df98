//! ClaimSeatHandler - Command handler for claiming a seat at a center.

use std::sync::Arc;

use crate::domain::billing::BillingPolicy;
use crate::domain::capacity::LockReason;
use crate::domain::enrollment::{Enrollment, EnrollmentError, EnrollmentStatus};
use crate::domain::foundation::{CenterId, CourseId, EnrollmentId, Timestamp, UserId};
use crate::ports::{CenterRepository, CommitOutcome, CourseReader, EnrollmentChange, EnrollmentRepository};

use super::MAX_COMMIT_ATTEMPTS;

/// Command to claim a seat.
#[derive(Debug, Clone)]
pub struct ClaimSeatCommand {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub center_id: CenterId,
}

/// Result of a claim.
#[derive(Debug, Clone)]
pub struct ClaimSeatResult {
    pub enrollment: Enrollment,
    /// The user already held a Pending claim at this center; nothing changed.
    pub already_claimed: bool,
}

/// Handler for seat claims.
///
/// The enrollment write and the seat reservation commit together, so a
/// claim never holds a seat without a record or the other way round.
pub struct ClaimSeatHandler {
    enrollments: Arc<dyn EnrollmentRepository>,
    centers: Arc<dyn CenterRepository>,
    courses: Arc<dyn CourseReader>,
    policy: BillingPolicy,
}

impl ClaimSeatHandler {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        centers: Arc<dyn CenterRepository>,
        courses: Arc<dyn CourseReader>,
        policy: BillingPolicy,
    ) -> Self {
        Self {
            enrollments,
            centers,
            courses,
            policy,
        }
    }

    pub async fn handle(&self, cmd: ClaimSeatCommand) -> Result<ClaimSeatResult, EnrollmentError> {
        let course = self
            .courses
            .find_by_id(&cmd.course_id)
            .await?
            .ok_or_else(|| EnrollmentError::course_not_found(cmd.course_id))?;
        if !course.center_based {
            return Err(EnrollmentError::not_center_backed(course.id, course.title));
        }

        let center = self
            .centers
            .find_by_id(&cmd.center_id)
            .await?
            .filter(|c| c.course_id == course.id)
            .ok_or_else(|| EnrollmentError::center_not_found(cmd.center_id))?;

        let mut last_id = EnrollmentId::new();
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let now = Timestamp::now();
            let existing = self
                .enrollments
                .find_by_user_and_course(&cmd.user_id, &course.id)
                .await?;

            let change = match existing {
                None => {
                    let (enrollment, effect) = Enrollment::claim(
                        last_id,
                        cmd.user_id.clone(),
                        course.id,
                        center.id,
                        course.price,
                        now,
                        &self.policy,
                    );
                    EnrollmentChange::insert(enrollment, effect, now)
                }
                Some(existing) => match existing.status {
                    EnrollmentStatus::Active => {
                        return Err(EnrollmentError::already_enrolled(course.id));
                    }
                    EnrollmentStatus::Pending => {
                        let bound_center = existing.center_id;
                        return match bound_center {
                            Some(bound) if bound == center.id => Ok(ClaimSeatResult {
                                enrollment: existing,
                                already_claimed: true,
                            }),
                            Some(bound) => Err(EnrollmentError::location_locked(bound)),
                            None => Err(EnrollmentError::invalid_state(
                                "pending purchase",
                                "claim a seat on",
                            )),
                        };
                    }
                    EnrollmentStatus::Cancelled => {
                        let version = existing.version;
                        let mut enrollment = existing;
                        let effect =
                            enrollment.reclaim(center.id, course.price, now, &self.policy)?;
                        EnrollmentChange::update(enrollment, version, effect, now)
                    }
                },
            };
            last_id = change.enrollment.id;

            match self.enrollments.commit(change).await? {
                CommitOutcome::Applied(enrollment) => {
                    tracing::info!(
                        enrollment_id = %enrollment.id,
                        user_id = %enrollment.user_id,
                        center_id = %center.id,
                        "Seat claimed"
                    );
                    return Ok(ClaimSeatResult {
                        enrollment,
                        already_claimed: false,
                    });
                }
                CommitOutcome::Conflict => {
                    tracing::debug!(user_id = %cmd.user_id, "Claim raced another write, retrying");
                    last_id = EnrollmentId::new();
                }
                CommitOutcome::SeatUnavailable { center_id } => {
                    let reason = self.lock_reason(&center_id, now).await;
                    tracing::info!(center_id = %center_id, ?reason, "Claim refused");
                    return Err(EnrollmentError::center_locked(center_id, reason));
                }
            }
        }
        Err(EnrollmentError::Conflict(last_id))
    }

    /// Why the store refused the seat. Falls back to `Full` when the center
    /// looks open again by the time it is re-read.
    async fn lock_reason(&self, center_id: &CenterId, now: Timestamp) -> LockReason {
        match self.centers.find_by_id(center_id).await {
            Ok(Some(center)) => center.lock_reason(now).unwrap_or(LockReason::Full),
            _ => LockReason::Full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::application::handlers::enrollment::test_support::{
        add_center, center, seat_course, shared, user,
    };
    use crate::domain::capacity::Center;
    use crate::ports::CourseSummary;

    fn handler(store: &InMemoryStore) -> ClaimSeatHandler {
        ClaimSeatHandler::new(
            shared(store),
            shared(store),
            shared(store),
            BillingPolicy::default(),
        )
    }

    fn command(name: &str, course: &CourseSummary, center: &Center) -> ClaimSeatCommand {
        ClaimSeatCommand {
            user_id: user(name),
            course_id: course.id,
            center_id: center.id,
        }
    }

    #[tokio::test]
    async fn claim_reserves_seat_and_sets_due_date() {
        let (store, course, c) = seat_course(2).await;

        let result = handler(&store).handle(command("alice", &course, &c)).await.unwrap();

        assert!(!result.already_claimed);
        assert_eq!(result.enrollment.status, EnrollmentStatus::Pending);
        assert_eq!(result.enrollment.amount, course.price);
        assert!(result.enrollment.next_payment_due.is_some());
        assert_eq!(center(&store, &c.id).await.current_enrollment, 1);
    }

    #[tokio::test]
    async fn repeated_claim_returns_same_enrollment_without_second_seat() {
        let (store, course, c) = seat_course(2).await;
        let h = handler(&store);

        let first = h.handle(command("alice", &course, &c)).await.unwrap();
        let second = h.handle(command("alice", &course, &c)).await.unwrap();

        assert!(second.already_claimed);
        assert_eq!(first.enrollment.id, second.enrollment.id);
        assert_eq!(center(&store, &c.id).await.current_enrollment, 1);
    }

    #[tokio::test]
    async fn full_center_rejects_with_reason() {
        let (store, course, c) = seat_course(1).await;
        let h = handler(&store);
        h.handle(command("alice", &course, &c)).await.unwrap();

        let err = h.handle(command("bob", &course, &c)).await.unwrap_err();

        assert_eq!(err, EnrollmentError::center_locked(c.id, LockReason::Full));
        assert_eq!(center(&store, &c.id).await.current_enrollment, 1);
        assert_eq!(store.enrollment_count().await, 1);
    }

    #[tokio::test]
    async fn manually_locked_center_rejects() {
        let (store, course, c) = seat_course(3).await;
        store.set_locked(&c.id, true, Timestamp::now()).await.unwrap();

        let err = handler(&store).handle(command("alice", &course, &c)).await.unwrap_err();

        assert_eq!(err, EnrollmentError::center_locked(c.id, LockReason::ManuallyLocked));
    }

    #[tokio::test]
    async fn pending_claim_elsewhere_is_location_locked() {
        let (store, course, c) = seat_course(3).await;
        let other = add_center(&store, course.id, 3).await;
        let h = handler(&store);
        h.handle(command("alice", &course, &c)).await.unwrap();

        let err = h.handle(command("alice", &course, &other)).await.unwrap_err();

        assert_eq!(err, EnrollmentError::location_locked(c.id));
        assert_eq!(center(&store, &other.id).await.current_enrollment, 0);
    }

    #[tokio::test]
    async fn center_of_another_course_is_not_found() {
        let (store, course, _) = seat_course(3).await;
        let foreign = add_center(&store, CourseId::new(), 3).await;

        let err = handler(&store)
            .handle(command("alice", &course, &foreign))
            .await
            .unwrap_err();

        assert_eq!(err, EnrollmentError::center_not_found(foreign.id));
    }

    #[tokio::test]
    async fn course_without_centers_is_rejected() {
        let store = InMemoryStore::new();
        let course = CourseSummary {
            id: CourseId::new(),
            title: "Algebra".to_string(),
            slug: "algebra".to_string(),
            price: 2000,
            center_based: false,
        };
        store.insert_course(course.clone()).await;
        let c = add_center(&store, course.id, 1).await;

        let err = handler(&store).handle(command("alice", &course, &c)).await.unwrap_err();

        assert!(matches!(err, EnrollmentError::NotCenterBacked { .. }));
    }

    #[tokio::test]
    async fn database_failure_leaves_no_seat_taken() {
        let (store, course, c) = seat_course(1).await;
        store.fail_next_commits(1).await;

        let err = handler(&store).handle(command("alice", &course, &c)).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(center(&store, &c.id).await.current_enrollment, 0);
        assert_eq!(store.enrollment_count().await, 0);
    }
}
