//! PaymentEventLog port - audit trail of gateway notifications.
//!
//! Every delivery that passes signature verification is recorded with its
//! raw payload and what settlement did with it. Records are keyed by
//! (payment id, status); a replayed delivery leaves the first record intact.
//!
//! The log is not the idempotency guard. Settlement decides from the
//! enrollment or subscription state, because a replay can arrive after a
//! log write failed.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// What settlement did with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    AlreadyProcessed,
    Ignored,
    /// Needs manual follow-up (e.g. late payment with no seat left).
    NeedsAttention,
    Failed,
}

impl EventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOutcome::Applied => "applied",
            EventOutcome::AlreadyProcessed => "already_processed",
            EventOutcome::Ignored => "ignored",
            EventOutcome::NeedsAttention => "needs_attention",
            EventOutcome::Failed => "failed",
        }
    }
}

/// One gateway delivery.
#[derive(Debug, Clone)]
pub struct PaymentEventRecord {
    pub payment_id: String,

    /// Status string as sent by the gateway.
    pub status: String,

    pub reference: Option<String>,
    pub outcome: EventOutcome,

    /// Why it was ignored or failed.
    pub detail: Option<String>,

    /// Original payload.
    pub payload: serde_json::Value,

    pub received_at: Timestamp,
}

/// Result of attempting to save a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First record for this (payment id, status).
    Inserted,
    /// A record already exists; nothing was written.
    AlreadyExists,
}

/// Port for the payment audit log.
///
/// Implementations should use a primary key on (payment_id, status) so
/// concurrent deliveries cannot both insert.
#[async_trait]
pub trait PaymentEventLog: Send + Sync {
    /// Record a delivery with `ON CONFLICT DO NOTHING` semantics.
    async fn record(&self, record: PaymentEventRecord) -> Result<SaveResult, DomainError>;

    /// The record for (payment id, status), if any.
    async fn find(
        &self,
        payment_id: &str,
        status: &str,
    ) -> Result<Option<PaymentEventRecord>, DomainError>;
}
