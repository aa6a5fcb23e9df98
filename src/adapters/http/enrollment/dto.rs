//! Request and response bodies for enrollment endpoints.
//!
//! Field names are camelCase to match the web client.

use serde::{Deserialize, Serialize};

use crate::application::handlers::{
    ClaimSeatResult, EnrollInCourseResult, EnrollmentView, InitiatePaymentResult,
    PaymentStatusView, RecordManualPaymentResult,
};
use crate::domain::enrollment::{ActivationKind, Enrollment, EnrollmentStatus};
use crate::domain::foundation::{CenterId, CourseId, EnrollmentId, Timestamp};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSeatRequest {
    pub course_id: CourseId,
    pub center_id: CenterId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollInCourseRequest {
    pub course_id: CourseId,
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub enrollment_id: EnrollmentId,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusParams {
    pub payment_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideCenterRequest {
    pub center_id: CenterId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualPaymentRequest {
    pub amount: i64,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

/// An enrollment as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub id: EnrollmentId,
    pub course_id: CourseId,
    pub center_id: Option<CenterId>,
    pub status: EnrollmentStatus,
    pub amount: i64,
    pub next_payment_due: Option<Timestamp>,
    pub paid_at: Option<Timestamp>,
    pub is_ejected: bool,
    pub ejection_count: u32,
    pub ejected_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(e: Enrollment) -> Self {
        Self {
            id: e.id,
            course_id: e.course_id,
            center_id: e.center_id,
            status: e.status,
            amount: e.amount,
            next_payment_due: e.next_payment_due,
            paid_at: e.paid_at,
            is_ejected: e.is_ejected,
            ejection_count: e.ejection_count,
            ejected_at: e.ejected_at,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSeatResponse {
    pub enrollment: EnrollmentResponse,
    pub already_claimed: bool,
}

impl From<ClaimSeatResult> for ClaimSeatResponse {
    fn from(result: ClaimSeatResult) -> Self {
        Self {
            enrollment: result.enrollment.into(),
            already_claimed: result.already_claimed,
        }
    }
}

/// A payment the client should now complete on the payer's phone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStartedResponse {
    pub enrollment_id: EnrollmentId,
    pub payment_id: String,
    pub reference: String,
    pub payment_link: Option<String>,
}

impl From<InitiatePaymentResult> for PaymentStartedResponse {
    fn from(result: InitiatePaymentResult) -> Self {
        Self {
            enrollment_id: result.enrollment_id,
            payment_id: result.payment_id,
            reference: result.reference,
            payment_link: result.payment_link,
        }
    }
}

impl From<EnrollInCourseResult> for PaymentStartedResponse {
    fn from(result: EnrollInCourseResult) -> Self {
        Self {
            enrollment_id: result.enrollment.id,
            payment_id: result.payment.payment_id,
            reference: result.reference,
            payment_link: result.payment.payment_link,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub enrollment_id: EnrollmentId,
    pub status: EnrollmentStatus,
    pub course_title: String,
    pub course_slug: String,
}

impl From<PaymentStatusView> for PaymentStatusResponse {
    fn from(view: PaymentStatusView) -> Self {
        Self {
            enrollment_id: view.enrollment_id,
            status: view.status,
            course_title: view.course_title,
            course_slug: view.course_slug,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentDetailResponse {
    pub enrollment: EnrollmentResponse,
    pub days_overdue: u32,
    pub can_re_enroll: bool,
    pub re_enrollment_deadline: Option<Timestamp>,
}

impl From<EnrollmentView> for EnrollmentDetailResponse {
    fn from(view: EnrollmentView) -> Self {
        Self {
            enrollment: view.enrollment.into(),
            days_overdue: view.days_overdue,
            can_re_enroll: view.can_re_enroll,
            re_enrollment_deadline: view.re_enrollment_deadline,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualPaymentResponse {
    pub enrollment: EnrollmentResponse,
    pub kind: ActivationKind,
    pub payment_id: String,
}

impl From<RecordManualPaymentResult> for ManualPaymentResponse {
    fn from(result: RecordManualPaymentResult) -> Self {
        Self {
            enrollment: result.enrollment.into(),
            kind: result.kind,
            payment_id: result.payment_id,
        }
    }
}
