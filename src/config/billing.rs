//! Billing, subscription and cron configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::billing::BillingPolicy;
use crate::domain::subscription::SubscriptionPolicy;

use super::error::ValidationError;

pub const MIN_CRON_SECRET_LEN: usize = 16;

/// Recurring billing settings for seats and the platform subscription
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    #[serde(default = "default_period_days")]
    pub period_days: i64,

    /// Days before the due date that the payment warning goes out
    #[serde(default = "default_warning_days")]
    pub warning_days: i64,

    /// Days after ejection during which an admin unlock is allowed
    #[serde(default = "default_grace_days")]
    pub re_enrollment_grace_days: i64,

    #[serde(default = "default_trial_days")]
    pub trial_days: i64,

    #[serde(default = "default_subscription_price")]
    pub subscription_price: i64,

    #[serde(default = "default_period_days")]
    pub subscription_period_days: i64,

    /// Comma-separated roles that never pay the subscription
    #[serde(default = "default_excluded_roles")]
    pub excluded_roles: String,

    /// Shared secret expected in `X-Cron-Secret`
    pub cron_secret: SecretString,
}

impl BillingConfig {
    /// Seat billing policy.
    pub fn billing_policy(&self) -> Result<BillingPolicy, ValidationError> {
        BillingPolicy::new(
            self.period_days,
            self.warning_days,
            self.re_enrollment_grace_days,
        )
        .map_err(|e| ValidationError::InvalidBilling {
            field: "period_days",
            reason: e.to_string(),
        })
    }

    /// Subscription gate policy.
    pub fn subscription_policy(&self) -> Result<SubscriptionPolicy, ValidationError> {
        let billing = BillingPolicy::new(self.subscription_period_days, self.warning_days, 0)
            .map_err(|e| ValidationError::InvalidBilling {
                field: "subscription_period_days",
                reason: e.to_string(),
            })?;

        Ok(SubscriptionPolicy {
            trial_days: self.trial_days,
            price: self.subscription_price,
            billing,
            excluded_roles: self
                .excluded_roles
                .split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
        })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cron_secret.expose_secret().len() < MIN_CRON_SECRET_LEN {
            return Err(ValidationError::CronSecretTooShort(MIN_CRON_SECRET_LEN));
        }
        if self.trial_days < 0 {
            return Err(ValidationError::InvalidBilling {
                field: "trial_days",
                reason: "must not be negative".to_string(),
            });
        }
        if self.subscription_price <= 0 {
            return Err(ValidationError::InvalidBilling {
                field: "subscription_price",
                reason: "must be positive".to_string(),
            });
        }
        self.billing_policy()?;
        self.subscription_policy()?;
        Ok(())
    }
}

fn default_period_days() -> i64 {
    30
}

fn default_warning_days() -> i64 {
    3
}

fn default_grace_days() -> i64 {
    30
}

fn default_trial_days() -> i64 {
    7
}

fn default_subscription_price() -> i64 {
    1000
}

fn default_excluded_roles() -> String {
    "admin,staff".to_string()
}
