//! Request and response bodies for the subscription gate.

use serde::{Deserialize, Serialize};

use crate::application::handlers::{InitiateSubscriptionPaymentResult, StartTrialResult};
use crate::domain::foundation::Timestamp;
use crate::domain::subscription::{AccessStatus, TrialOutcome};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPaymentRequest {
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessStatusResponse {
    pub needs_to_pay: bool,
    pub is_excluded: bool,
    pub trial_active: bool,
    pub trial_days_remaining: u32,
    pub has_active_subscription: bool,
    pub subscription_days_remaining: u32,
    pub paid_until: Option<Timestamp>,
    pub price: i64,
}

impl From<AccessStatus> for AccessStatusResponse {
    fn from(s: AccessStatus) -> Self {
        Self {
            needs_to_pay: s.needs_to_pay,
            is_excluded: s.is_excluded,
            trial_active: s.trial_active,
            trial_days_remaining: s.trial_days_remaining,
            has_active_subscription: s.has_active_subscription,
            subscription_days_remaining: s.subscription_days_remaining,
            paid_until: s.paid_until,
            price: s.price,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTrialResponse {
    pub outcome: TrialOutcome,
    pub access: AccessStatusResponse,
}

impl From<StartTrialResult> for StartTrialResponse {
    fn from(result: StartTrialResult) -> Self {
        Self {
            outcome: result.outcome,
            access: result.status.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPaymentResponse {
    pub payment_id: String,
    pub payment_link: Option<String>,
    pub reference: String,
    pub amount: i64,
}

impl From<InitiateSubscriptionPaymentResult> for SubscriptionPaymentResponse {
    fn from(result: InitiateSubscriptionPaymentResult) -> Self {
        Self {
            payment_id: result.payment_id,
            payment_link: result.payment_link,
            reference: result.reference,
            amount: result.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_outcome_serializes_snake_case() {
        let response = StartTrialResponse {
            outcome: TrialOutcome::SkippedAdmin,
            access: AccessStatusResponse {
                needs_to_pay: false,
                is_excluded: true,
                trial_active: false,
                trial_days_remaining: 0,
                has_active_subscription: false,
                subscription_days_remaining: 0,
                paid_until: None,
                price: 1000,
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["outcome"], "skipped_admin");
        assert_eq!(json["access"]["isExcluded"], true);
    }

    #[test]
    fn payment_request_accepts_empty_body() {
        let request: SubscriptionPaymentRequest = serde_json::from_str("{}").unwrap();
        assert!(request.phone_number.is_none());
    }
}
