//! Mock payment gateway for testing.
//!
//! Supports error injection and call tracking. Payment ids are generated
//! sequentially (`mock_pay_1`, `mock_pay_2`, ...) unless one is queued.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ports::{PaymentError, PaymentGateway, PaymentRequest, PaymentSession};

/// Mock payment gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// gateway.queue_payment_id("pay_123");
/// gateway.fail_next(PaymentError::network("timeout"));
/// ```
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    queued_ids: VecDeque<String>,
    next_error: Option<PaymentError>,
    requests: Vec<PaymentRequest>,
    issued: u64,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id to hand out on the next successful request.
    pub fn queue_payment_id(&self, id: impl Into<String>) {
        self.lock().queued_ids.push_back(id.into());
    }

    /// Error to return on the next request.
    pub fn fail_next(&self, error: PaymentError) {
        self.lock().next_error = Some(error);
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<PaymentRequest> {
        self.lock().requests.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn request_payment(&self, request: PaymentRequest) -> Result<PaymentSession, PaymentError> {
        let mut state = self.lock();
        state.requests.push(request);

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        let payment_id = match state.queued_ids.pop_front() {
            Some(id) => id,
            None => {
                state.issued += 1;
                format!("mock_pay_{}", state.issued)
            }
        };

        Ok(PaymentSession {
            payment_link: Some(format!("https://pay.test/{}", payment_id)),
            payment_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PaymentErrorCode;

    fn request() -> PaymentRequest {
        PaymentRequest {
            reference: "MONTHLY_SUB_user-1_1".to_string(),
            amount: 1000,
            description: "Monthly access".to_string(),
            phone_number: None,
            customer_email: None,
        }
    }

    #[tokio::test]
    async fn issues_sequential_ids_and_records_requests() {
        let gateway = MockPaymentGateway::new();

        let first = gateway.request_payment(request()).await.unwrap();
        let second = gateway.request_payment(request()).await.unwrap();

        assert_eq!(first.payment_id, "mock_pay_1");
        assert_eq!(second.payment_id, "mock_pay_2");
        assert_eq!(gateway.requests().len(), 2);
    }

    #[tokio::test]
    async fn queued_id_and_injected_error_apply_once() {
        let gateway = MockPaymentGateway::new();
        gateway.queue_payment_id("pay_abc");
        gateway.fail_next(PaymentError::network("timeout"));

        let err = gateway.request_payment(request()).await.unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::NetworkError);

        let ok = gateway.request_payment(request()).await.unwrap();
        assert_eq!(ok.payment_id, "pay_abc");
    }
}
