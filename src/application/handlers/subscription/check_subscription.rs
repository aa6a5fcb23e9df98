//! CheckSubscriptionHandler - Query handler for the access gate.

use std::sync::Arc;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::{AccessStatus, SubscriptionError, SubscriptionPolicy};
use crate::ports::SubscriptionRepository;

#[derive(Debug, Clone)]
pub struct CheckSubscriptionQuery {
    pub user_id: UserId,
}

/// Reports whether a user has to pay before using the platform.
pub struct CheckSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    policy: SubscriptionPolicy,
}

impl CheckSubscriptionHandler {
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>, policy: SubscriptionPolicy) -> Self {
        Self {
            subscriptions,
            policy,
        }
    }

    pub async fn handle(&self, query: CheckSubscriptionQuery) -> Result<AccessStatus, SubscriptionError> {
        let account = self
            .subscriptions
            .find(&query.user_id)
            .await?
            .ok_or_else(|| SubscriptionError::user_not_found(query.user_id.clone()))?;
        Ok(account.access_status(Timestamp::now(), &self.policy))
    }
}
