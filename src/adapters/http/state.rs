//! Shared application state for every route.

use std::sync::Arc;

use secrecy::SecretString;

use crate::application::handlers::{
    CheckSubscriptionHandler, ClaimSeatHandler, CreateCenterHandler, DeleteCenterHandler,
    EjectEnrollmentHandler, EnrollInCourseHandler, GetEnrollmentHandler, GetPaymentStatusHandler,
    InitiatePaymentHandler, InitiateSubscriptionPaymentHandler, ListCentersHandler,
    OverrideCenterHandler, RecordManualPaymentHandler, RunBillingSweepHandler,
    SetCenterLockHandler, SettlePaymentHandler, StartTrialHandler, UnlockEnrollmentHandler,
};
use crate::domain::billing::BillingPolicy;
use crate::domain::payment::WebhookSignatureVerifier;
use crate::domain::subscription::SubscriptionPolicy;
use crate::ports::{
    CenterRepository, CourseReader, EnrollmentRepository, Notifier, PaymentEventLog,
    PaymentGateway, RateLimiter, SubscriptionRepository,
};

use super::middleware::RateLimitCheck;

/// Dependencies shared by all handlers.
///
/// Cloned per request; every field is cheap to clone. Application
/// handlers are built on demand from these.
#[derive(Clone)]
pub struct AppState {
    pub centers: Arc<dyn CenterRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub courses: Arc<dyn CourseReader>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub payment_events: Arc<dyn PaymentEventLog>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub signature_verifier: Arc<WebhookSignatureVerifier>,
    /// Shared secret the scheduler sends on the billing-check route.
    pub cron_secret: Arc<SecretString>,
    pub billing: BillingPolicy,
    pub subscription: SubscriptionPolicy,
}

impl AppState {
    pub fn rate_limit(&self) -> RateLimitCheck {
        RateLimitCheck::new(self.rate_limiter.clone())
    }

    // Capacity

    pub fn list_centers_handler(&self) -> ListCentersHandler {
        ListCentersHandler::new(self.centers.clone(), self.courses.clone())
    }

    pub fn create_center_handler(&self) -> CreateCenterHandler {
        CreateCenterHandler::new(self.centers.clone(), self.courses.clone())
    }

    pub fn set_center_lock_handler(&self) -> SetCenterLockHandler {
        SetCenterLockHandler::new(self.centers.clone())
    }

    pub fn delete_center_handler(&self) -> DeleteCenterHandler {
        DeleteCenterHandler::new(self.centers.clone())
    }

    // Enrollment

    pub fn claim_seat_handler(&self) -> ClaimSeatHandler {
        ClaimSeatHandler::new(
            self.enrollments.clone(),
            self.centers.clone(),
            self.courses.clone(),
            self.billing,
        )
    }

    pub fn enroll_in_course_handler(&self) -> EnrollInCourseHandler {
        EnrollInCourseHandler::new(
            self.enrollments.clone(),
            self.courses.clone(),
            self.gateway.clone(),
        )
    }

    pub fn initiate_payment_handler(&self) -> InitiatePaymentHandler {
        InitiatePaymentHandler::new(
            self.enrollments.clone(),
            self.courses.clone(),
            self.gateway.clone(),
        )
    }

    pub fn payment_status_handler(&self) -> GetPaymentStatusHandler {
        GetPaymentStatusHandler::new(self.enrollments.clone(), self.courses.clone())
    }

    pub fn get_enrollment_handler(&self) -> GetEnrollmentHandler {
        GetEnrollmentHandler::new(self.enrollments.clone(), self.billing)
    }

    pub fn unlock_enrollment_handler(&self) -> UnlockEnrollmentHandler {
        UnlockEnrollmentHandler::new(self.enrollments.clone(), self.billing)
    }

    pub fn eject_enrollment_handler(&self) -> EjectEnrollmentHandler {
        EjectEnrollmentHandler::new(self.enrollments.clone(), self.notifier.clone(), self.billing)
    }

    pub fn override_center_handler(&self) -> OverrideCenterHandler {
        OverrideCenterHandler::new(self.enrollments.clone(), self.centers.clone())
    }

    pub fn record_manual_payment_handler(&self) -> RecordManualPaymentHandler {
        RecordManualPaymentHandler::new(
            self.enrollments.clone(),
            self.courses.clone(),
            self.notifier.clone(),
            self.billing,
        )
    }

    // Settlement and billing

    pub fn settle_payment_handler(&self) -> SettlePaymentHandler {
        SettlePaymentHandler::new(
            self.enrollments.clone(),
            self.subscriptions.clone(),
            self.courses.clone(),
            self.centers.clone(),
            self.payment_events.clone(),
            self.notifier.clone(),
            self.billing,
            self.subscription.clone(),
        )
    }

    pub fn billing_sweep_handler(&self) -> RunBillingSweepHandler {
        RunBillingSweepHandler::new(
            self.enrollments.clone(),
            self.subscriptions.clone(),
            self.notifier.clone(),
            self.billing,
            self.subscription.clone(),
        )
    }

    // Subscription

    pub fn start_trial_handler(&self) -> StartTrialHandler {
        StartTrialHandler::new(self.subscriptions.clone(), self.subscription.clone())
    }

    pub fn check_subscription_handler(&self) -> CheckSubscriptionHandler {
        CheckSubscriptionHandler::new(self.subscriptions.clone(), self.subscription.clone())
    }

    pub fn subscription_payment_handler(&self) -> InitiateSubscriptionPaymentHandler {
        InitiateSubscriptionPaymentHandler::new(
            self.subscriptions.clone(),
            self.gateway.clone(),
            self.subscription.clone(),
        )
    }
}
