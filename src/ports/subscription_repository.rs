//! Subscription repository port.
//!
//! Stores the subscription fields of user accounts. Payment application is
//! idempotent per gateway payment id and atomic with the `paid_until` move.

use async_trait::async_trait;

use crate::domain::billing::BillingPolicy;
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::subscription::UserAccount;

/// A confirmed subscription payment.
#[derive(Debug, Clone)]
pub struct SubscriptionPayment {
    pub user_id: UserId,
    /// Gateway payment id; applied at most once.
    pub payment_id: String,
    pub amount: i64,
    pub billing: BillingPolicy,
    pub at: Timestamp,
}

/// Result of applying a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentApplication {
    Applied { paid_until: Timestamp },
    AlreadyApplied,
    UnknownUser,
}

/// Repository port for user subscription state.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find(&self, user_id: &UserId) -> Result<Option<UserAccount>, DomainError>;

    /// Returns the stored account, inserting `account` first if the user is
    /// new. An existing account keeps its fields; a changed role or email
    /// from the identity provider is written through.
    async fn find_or_create(&self, account: &UserAccount) -> Result<UserAccount, DomainError>;

    /// Sets `trial_started_at` if it is still unset. Returns whether it was
    /// set by this call.
    async fn record_trial_start(&self, user_id: &UserId, at: Timestamp) -> Result<bool, DomainError>;

    /// Extends `paid_until` by one period from the later of `at` and the
    /// current end, unless this payment id was already applied.
    async fn apply_payment(
        &self,
        payment: SubscriptionPayment,
    ) -> Result<PaymentApplication, DomainError>;

    /// Accounts whose `paid_until` falls in `[now, horizon]` and were not
    /// warned for that `paid_until` yet.
    async fn find_expiring(
        &self,
        now: Timestamp,
        horizon: Timestamp,
    ) -> Result<Vec<UserAccount>, DomainError>;

    /// Records the warning for `paid_until`. Returns false if `paid_until`
    /// moved meanwhile or the warning was already recorded.
    async fn mark_warning_sent(
        &self,
        user_id: &UserId,
        paid_until: Timestamp,
    ) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SubscriptionRepository) {}
    }
}
