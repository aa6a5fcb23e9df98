//! StartTrialHandler - Starts the one-time free trial on first sign-in.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::{
    AccessStatus, SubscriptionError, SubscriptionPolicy, TrialOutcome, UserAccount,
};
use crate::ports::SubscriptionRepository;

/// Command to start a trial. Role and email come from the identity provider
/// and are written through to the account.
#[derive(Debug, Clone)]
pub struct StartTrialCommand {
    pub user_id: UserId,
    pub role: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartTrialResult {
    pub outcome: TrialOutcome,
    pub status: AccessStatus,
}

pub struct StartTrialHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    policy: SubscriptionPolicy,
}

impl StartTrialHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>, policy: SubscriptionPolicy) -> Self {
        Self {
            subscriptions,
            policy,
        }
    }

    pub async fn handle(&self, cmd: StartTrialCommand) -> Result<StartTrialResult, SubscriptionError> {
        let now = Timestamp::now();
        let mut account = self
            .subscriptions
            .find_or_create(&UserAccount::new(cmd.user_id.clone(), cmd.role, cmd.email, now))
            .await?;

        let mut outcome = account.start_trial(now, &self.policy);
        if outcome == TrialOutcome::TrialStarted
            && !self.subscriptions.record_trial_start(&cmd.user_id, now).await?
        {
            // A concurrent request started it first
            account = self
                .subscriptions
                .find(&cmd.user_id)
                .await?
                .ok_or_else(|| SubscriptionError::user_not_found(cmd.user_id.clone()))?;
            outcome = TrialOutcome::TrialAlreadyStarted;
        }

        if outcome == TrialOutcome::TrialStarted {
            tracing::info!(user_id = %cmd.user_id, trial_days = self.policy.trial_days, "Trial started");
        }

        Ok(StartTrialResult {
            outcome,
            status: account.access_status(now, &self.policy),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::billing::BillingPolicy;
    use crate::ports::SubscriptionPayment;

    fn handler(store: &InMemoryStore) -> StartTrialHandler {
        StartTrialHandler::new(Arc::new(store.clone()), SubscriptionPolicy::default())
    }

    fn cmd(user: &str, role: Option<&str>) -> StartTrialCommand {
        StartTrialCommand {
            user_id: UserId::new(user).unwrap(),
            role: role.map(str::to_string),
            email: None,
        }
    }

    #[tokio::test]
    async fn first_call_starts_the_trial() {
        let store = InMemoryStore::new();

        let result = handler(&store).handle(cmd("ama", Some("student"))).await.unwrap();

        assert_eq!(result.outcome, TrialOutcome::TrialStarted);
        assert!(result.status.trial_active);
        assert_eq!(result.status.trial_days_remaining, 7);
        assert!(!result.status.needs_to_pay);
    }

    #[tokio::test]
    async fn second_call_keeps_the_original_start() {
        let store = InMemoryStore::new();
        handler(&store).handle(cmd("ama", None)).await.unwrap();
        let started = SubscriptionRepository::find(&store, &UserId::new("ama").unwrap())
            .await
            .unwrap()
            .unwrap()
            .trial_started_at;

        let again = handler(&store).handle(cmd("ama", None)).await.unwrap();

        assert_eq!(again.outcome, TrialOutcome::TrialAlreadyStarted);
        let account = SubscriptionRepository::find(&store, &UserId::new("ama").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.trial_started_at, started);
    }

    #[tokio::test]
    async fn excluded_roles_skip_the_trial() {
        let store = InMemoryStore::new();

        let result = handler(&store).handle(cmd("boss", Some("Admin"))).await.unwrap();

        assert_eq!(result.outcome, TrialOutcome::SkippedAdmin);
        assert!(result.status.is_excluded);
        assert!(!result.status.needs_to_pay);
    }

    #[tokio::test]
    async fn paying_users_do_not_get_a_trial() {
        let store = InMemoryStore::new();
        let user_id = UserId::new("kofi").unwrap();
        let now = Timestamp::now();
        SubscriptionRepository::find_or_create(&store, &UserAccount::new(user_id.clone(), None, None, now))
            .await
            .unwrap();
        SubscriptionRepository::apply_payment(
            &store,
            SubscriptionPayment {
                user_id: user_id.clone(),
                payment_id: "sub_1".to_string(),
                amount: 1000,
                billing: BillingPolicy::default(),
                at: now,
            },
        )
        .await
        .unwrap();

        let result = handler(&store).handle(cmd("kofi", None)).await.unwrap();

        assert_eq!(result.outcome, TrialOutcome::HasSubscription);
        assert!(result.status.has_active_subscription);
    }
}
