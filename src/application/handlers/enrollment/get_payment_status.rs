//! GetPaymentStatusHandler - Query handler for the client-side payment poll.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::enrollment::{EnrollmentError, EnrollmentStatus};
use crate::domain::foundation::{EnrollmentId, UserId};
use crate::ports::{CourseReader, EnrollmentRepository};

/// Query for the enrollment behind a gateway payment id.
#[derive(Debug, Clone)]
pub struct GetPaymentStatusQuery {
    pub payment_id: String,
    pub user_id: UserId,
}

/// What the payment page shows while waiting for the webhook.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusView {
    pub enrollment_id: EnrollmentId,
    pub status: EnrollmentStatus,
    pub course_title: String,
    pub course_slug: String,
}

/// Handler for the status poll. Payments of other users look like unknown
/// payments.
pub struct GetPaymentStatusHandler {
    enrollments: Arc<dyn EnrollmentRepository>,
    courses: Arc<dyn CourseReader>,
}

impl GetPaymentStatusHandler {
    pub fn new(enrollments: Arc<dyn EnrollmentRepository>, courses: Arc<dyn CourseReader>) -> Self {
        Self {
            enrollments,
            courses,
        }
    }

    pub async fn handle(&self, query: GetPaymentStatusQuery) -> Result<PaymentStatusView, EnrollmentError> {
        let enrollment = self
            .enrollments
            .find_by_payment_id(&query.payment_id)
            .await?
            .filter(|e| e.is_owned_by(&query.user_id))
            .ok_or_else(|| EnrollmentError::not_found_for_payment(query.payment_id.clone()))?;

        let course = self
            .courses
            .find_by_id(&enrollment.course_id)
            .await?
            .ok_or_else(|| EnrollmentError::course_not_found(enrollment.course_id))?;

        Ok(PaymentStatusView {
            enrollment_id: enrollment.id,
            status: enrollment.status,
            course_title: course.title,
            course_slug: course.slug,
        })
    }
}
