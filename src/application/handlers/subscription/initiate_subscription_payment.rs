//! InitiateSubscriptionPaymentHandler - Starts a monthly platform fee
//! payment with the gateway.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::payment::PaymentReference;
use crate::domain::subscription::{SubscriptionError, SubscriptionPolicy};
use crate::ports::{PaymentGateway, PaymentRequest, SubscriptionRepository};

use crate::application::handlers::enrollment::validate_phone;

#[derive(Debug, Clone)]
pub struct InitiateSubscriptionPaymentCommand {
    pub user_id: UserId,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitiateSubscriptionPaymentResult {
    pub payment_id: String,
    pub payment_link: Option<String>,
    pub reference: String,
    pub amount: i64,
}

pub struct InitiateSubscriptionPaymentHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    policy: SubscriptionPolicy,
}

impl InitiateSubscriptionPaymentHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        policy: SubscriptionPolicy,
    ) -> Self {
        Self {
            subscriptions,
            gateway,
            policy,
        }
    }

    pub async fn handle(
        &self,
        cmd: InitiateSubscriptionPaymentCommand,
    ) -> Result<InitiateSubscriptionPaymentResult, SubscriptionError> {
        let phone_number = cmd
            .phone_number
            .as_deref()
            .map(validate_phone)
            .transpose()
            .map_err(|e| SubscriptionError::ValidationFailed {
                field: "phone_number".to_string(),
                message: e.to_string(),
            })?;

        let now = Timestamp::now();
        let account = self
            .subscriptions
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| SubscriptionError::user_not_found(cmd.user_id.clone()))?;
        account.ensure_can_purchase(now)?;

        let reference = PaymentReference::subscription(&cmd.user_id, now).to_string();
        let session = self
            .gateway
            .request_payment(PaymentRequest {
                reference: reference.clone(),
                amount: self.policy.price,
                description: "Monthly platform subscription".to_string(),
                phone_number,
                customer_email: account.email.clone(),
            })
            .await
            .map_err(DomainError::from)?;

        tracing::info!(
            user_id = %cmd.user_id,
            payment_id = %session.payment_id,
            reference = %reference,
            "Subscription payment started"
        );

        Ok(InitiateSubscriptionPaymentResult {
            payment_id: session.payment_id,
            payment_link: session.payment_link,
            reference,
            amount: self.policy.price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::adapters::payment_gateway::MockPaymentGateway;
    use crate::domain::billing::BillingPolicy;
    use crate::domain::subscription::UserAccount;
    use crate::ports::{PaymentError, SubscriptionPayment};

    async fn store_with(user: &str) -> (InMemoryStore, UserId) {
        let store = InMemoryStore::new();
        let user_id = UserId::new(user).unwrap();
        let account = UserAccount::new(user_id.clone(), None, Some("ama@example.com".to_string()), Timestamp::now());
        SubscriptionRepository::find_or_create(&store, &account).await.unwrap();
        (store, user_id)
    }

    fn handler(store: &InMemoryStore, gateway: &MockPaymentGateway) -> InitiateSubscriptionPaymentHandler {
        InitiateSubscriptionPaymentHandler::new(
            Arc::new(store.clone()),
            Arc::new(gateway.clone()),
            SubscriptionPolicy::default(),
        )
    }

    #[tokio::test]
    async fn requests_the_subscription_price() {
        let (store, user_id) = store_with("ama").await;
        let gateway = MockPaymentGateway::new();
        gateway.queue_payment_id("sub_pay_1");

        let result = handler(&store, &gateway)
            .handle(InitiateSubscriptionPaymentCommand {
                user_id: user_id.clone(),
                phone_number: Some("237670000000".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(result.payment_id, "sub_pay_1");
        assert_eq!(result.amount, 1000);
        assert!(result.reference.starts_with("MONTHLY_SUB_ama_"));
        let request = gateway.last_request().unwrap();
        assert_eq!(request.amount, 1000);
        assert_eq!(request.customer_email.as_deref(), Some("ama@example.com"));
        assert!(matches!(
            PaymentReference::parse(&request.reference),
            Some(PaymentReference::Subscription { ref user_id, .. }) if user_id.as_str() == "ama"
        ));
    }

    #[tokio::test]
    async fn active_subscription_is_rejected() {
        let (store, user_id) = store_with("ama").await;
        SubscriptionRepository::apply_payment(
            &store,
            SubscriptionPayment {
                user_id: user_id.clone(),
                payment_id: "sub_0".to_string(),
                amount: 1000,
                billing: BillingPolicy::default(),
                at: Timestamp::now(),
            },
        )
        .await
        .unwrap();
        let gateway = MockPaymentGateway::new();

        let err = handler(&store, &gateway)
            .handle(InitiateSubscriptionPaymentCommand { user_id, phone_number: None })
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::AlreadyActive { .. }));
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_is_upstream_error() {
        let (store, user_id) = store_with("ama").await;
        let gateway = MockPaymentGateway::new();
        gateway.fail_next(PaymentError::network("connection refused"));

        let err = handler(&store, &gateway)
            .handle(InitiateSubscriptionPaymentCommand { user_id, phone_number: None })
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(matches!(err, SubscriptionError::UpstreamPayment(_)));
    }

    #[tokio::test]
    async fn malformed_phone_is_rejected_before_the_gateway() {
        let (store, user_id) = store_with("ama").await;
        let gateway = MockPaymentGateway::new();

        let err = handler(&store, &gateway)
            .handle(InitiateSubscriptionPaymentCommand {
                user_id,
                phone_number: Some("12345".to_string()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::ValidationFailed { .. }));
        assert!(gateway.requests().is_empty());
    }
}
