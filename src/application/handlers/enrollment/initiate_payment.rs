//! InitiatePaymentHandler - Command handler for starting a payment on an
//! existing enrollment.

use std::sync::Arc;

use crate::domain::enrollment::{EnrollmentError, EnrollmentStatus};
use crate::domain::foundation::{DomainError, EnrollmentId, Timestamp, UserId};
use crate::domain::payment::PaymentReference;
use crate::ports::{CourseReader, EnrollmentRepository, PaymentGateway, PaymentRequest};

use super::{attach_payment, load, validate_phone};

/// Command to start a payment.
#[derive(Debug, Clone)]
pub struct InitiatePaymentCommand {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub phone_number: Option<String>,
}

/// Where the payer completes the payment.
#[derive(Debug, Clone)]
pub struct InitiatePaymentResult {
    pub enrollment_id: EnrollmentId,
    pub payment_id: String,
    pub reference: String,
    pub payment_link: Option<String>,
}

/// Handler for payment initiation.
///
/// Allowed for Pending enrollments, for Active seats paying the next period
/// and for ejected ones paying their way back in.
pub struct InitiatePaymentHandler {
    enrollments: Arc<dyn EnrollmentRepository>,
    courses: Arc<dyn CourseReader>,
    gateway: Arc<dyn PaymentGateway>,
}

impl InitiatePaymentHandler {
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

    pub async fn handle(&self, cmd: InitiatePaymentCommand) -> Result<InitiatePaymentResult, EnrollmentError> {
        let phone_number = cmd.phone_number.as_deref().map(validate_phone).transpose()?;

        let enrollment = load(self.enrollments.as_ref(), &cmd.enrollment_id).await?;
        if !enrollment.is_owned_by(&cmd.user_id) {
            return Err(EnrollmentError::NotOwner);
        }
        match (enrollment.status, enrollment.center_id) {
            (EnrollmentStatus::Active, None) => {
                return Err(EnrollmentError::already_active(enrollment.id))
            }
            (EnrollmentStatus::Cancelled, _) if !enrollment.is_ejected => {
                return Err(EnrollmentError::invalid_state("cancelled", "pay for"));
            }
            _ => {}
        }

        let course = self
            .courses
            .find_by_id(&enrollment.course_id)
            .await?
            .ok_or_else(|| EnrollmentError::course_not_found(enrollment.course_id))?;

        let now = Timestamp::now();
        let reference = match enrollment.center_id {
            Some(_) => PaymentReference::seat(&enrollment.id, now),
            None => PaymentReference::course(&enrollment.id, now),
        }
        .to_string();

        let session = self
            .gateway
            .request_payment(PaymentRequest {
                reference: reference.clone(),
                amount: enrollment.amount,
                description: course.title,
                phone_number,
                customer_email: None,
            })
            .await
            .map_err(DomainError::from)?;

        let enrollment = attach_payment(self.enrollments.as_ref(), enrollment, &session, &reference).await?;

        tracing::info!(
            enrollment_id = %enrollment.id,
            payment_id = %session.payment_id,
            reference = %reference,
            "Payment initiated"
        );
        Ok(InitiatePaymentResult {
            enrollment_id: enrollment.id,
            payment_id: session.payment_id,
            reference,
            payment_link: session.payment_link,
        })
    }
}
