//! EnrollInCourseHandler - Command handler for buying a conventional course.

use std::sync::Arc;

use crate::domain::enrollment::{Enrollment, EnrollmentError, LedgerEffect};
use crate::domain::foundation::{CourseId, DomainError, EnrollmentId, Timestamp, UserId};
use crate::domain::payment::PaymentReference;
use crate::ports::{
    CommitOutcome, CourseReader, EnrollmentChange, EnrollmentRepository, PaymentGateway,
    PaymentRequest, PaymentSession,
};

use super::{attach_payment, validate_phone, MAX_COMMIT_ATTEMPTS};

/// Command to buy a course without centers.
#[derive(Debug, Clone)]
pub struct EnrollInCourseCommand {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub phone_number: String,
}

/// Result of starting a purchase.
#[derive(Debug, Clone)]
pub struct EnrollInCourseResult {
    pub enrollment: Enrollment,
    pub payment: PaymentSession,
    pub reference: String,
}

/// Handler for conventional purchases.
///
/// Writes the Pending record first, then asks the gateway to collect. A
/// gateway failure leaves a Pending record without a transaction id, which
/// the next attempt resets in place.
pub struct EnrollInCourseHandler {
    enrollments: Arc<dyn EnrollmentRepository>,
    courses: Arc<dyn CourseReader>,
    gateway: Arc<dyn PaymentGateway>,
}

impl EnrollInCourseHandler {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        courses: Arc<dyn CourseReader>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            enrollments,
            courses,
            gateway,
        }
    }

    pub async fn handle(&self, cmd: EnrollInCourseCommand) -> Result<EnrollInCourseResult, EnrollmentError> {
        let phone_number = validate_phone(&cmd.phone_number)?;

        let course = self
            .courses
            .find_by_id(&cmd.course_id)
            .await?
            .ok_or_else(|| EnrollmentError::course_not_found(cmd.course_id))?;
        if course.center_based {
            return Err(EnrollmentError::validation(
                "course_id",
                "this course is joined by claiming a seat at a center",
            ));
        }
        if course.price <= 0 {
            return Err(EnrollmentError::validation("price", "course has no price to pay"));
        }

        let enrollment = self.start_purchase(&cmd.user_id, course.id, course.price).await?;

        let now = Timestamp::now();
        let reference = PaymentReference::course(&enrollment.id, now).to_string();
        let payment = self
            .gateway
            .request_payment(PaymentRequest {
                reference: reference.clone(),
                amount: course.price,
                description: course.title.clone(),
                phone_number: Some(phone_number),
                customer_email: None,
            })
            .await
            .map_err(|e| {
                tracing::error!(enrollment_id = %enrollment.id, error = %e, "Collection request failed");
                DomainError::from(e)
            })?;

        let enrollment = attach_payment(self.enrollments.as_ref(), enrollment, &payment, &reference).await?;

        tracing::info!(
            enrollment_id = %enrollment.id,
            payment_id = %payment.payment_id,
            "Course purchase started"
        );
        Ok(EnrollInCourseResult {
            enrollment,
            payment,
            reference,
        })
    }

    async fn start_purchase(
        &self,
        user_id: &UserId,
        course_id: CourseId,
        price: i64,
    ) -> Result<Enrollment, EnrollmentError> {
        let mut last_id = EnrollmentId::new();
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let now = Timestamp::now();
            let change = match self.enrollments.find_by_user_and_course(user_id, &course_id).await? {
                None => EnrollmentChange::insert(
                    Enrollment::start_purchase(last_id, user_id.clone(), course_id, price, now),
                    LedgerEffect::None,
                    now,
                ),
                Some(mut existing) => {
                    let version = existing.version;
                    existing.restart_purchase(price, now)?;
                    EnrollmentChange::update(existing, version, LedgerEffect::None, now)
                }
            };
            last_id = change.enrollment.id;

            match self.enrollments.commit(change).await? {
                CommitOutcome::Applied(enrollment) => return Ok(enrollment),
                CommitOutcome::Conflict => last_id = EnrollmentId::new(),
                CommitOutcome::SeatUnavailable { center_id } => {
                    return Err(EnrollmentError::capacity_exceeded(center_id));
                }
            }
        }
        Err(EnrollmentError::Conflict(last_id))
    }
}
