//! Billing policy shared by seat billing and the subscription gate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, ValidationError};

/// Length of a billing period, warning lookahead and grace window, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPolicy {
    pub period_days: i64,
    pub warning_days: i64,
    pub grace_days: i64,
}

impl BillingPolicy {
    /// Creates a policy, rejecting non-positive periods and windows.
    pub fn new(period_days: i64, warning_days: i64, grace_days: i64) -> Result<Self, ValidationError> {
        if period_days < 1 {
            return Err(ValidationError::out_of_range("period_days", 1, 366, period_days));
        }
        if warning_days < 0 || warning_days >= period_days {
            return Err(ValidationError::out_of_range(
                "warning_days",
                0,
                period_days - 1,
                warning_days,
            ));
        }
        if grace_days < 0 {
            return Err(ValidationError::out_of_range("grace_days", 0, 366, grace_days));
        }
        Ok(Self {
            period_days,
            warning_days,
            grace_days,
        })
    }

    /// Due date one period after `from`.
    pub fn next_due(&self, from: Timestamp) -> Timestamp {
        from.plus_days(self.period_days)
    }

    /// End of the warning lookahead starting at `now`.
    pub fn warning_horizon(&self, now: Timestamp) -> Timestamp {
        now.plus_days(self.warning_days)
    }

    /// End of the grace window opened at `from`.
    pub fn grace_deadline(&self, from: Timestamp) -> Timestamp {
        from.plus_days(self.grace_days)
    }
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            period_days: 30,
            warning_days: 3,
            grace_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_monthly_with_three_day_warning() {
        let policy = BillingPolicy::default();
        assert_eq!(policy.period_days, 30);
        assert_eq!(policy.warning_days, 3);
        assert_eq!(policy.grace_days, 30);
    }

    #[test]
    fn rejects_zero_period() {
        assert!(BillingPolicy::new(0, 0, 0).is_err());
    }

    #[test]
    fn rejects_warning_window_longer_than_period() {
        assert!(BillingPolicy::new(7, 7, 0).is_err());
        assert!(BillingPolicy::new(7, 6, 0).is_ok());
    }

    #[test]
    fn next_due_adds_one_period() {
        let now = Timestamp::now();
        let policy = BillingPolicy::default();
        assert_eq!(policy.next_due(now), now.plus_days(30));
        assert_eq!(policy.warning_horizon(now), now.plus_days(3));
        assert_eq!(policy.grace_deadline(now), now.plus_days(30));
    }
}
