//! PostgreSQL implementation of PaymentEventLog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{EventOutcome, PaymentEventLog, PaymentEventRecord, SaveResult};

use super::db_error;

#[derive(Clone)]
pub struct PostgresPaymentEventLog {
    pool: PgPool,
}

impl PostgresPaymentEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    payment_id: String,
    status: String,
    reference: Option<String>,
    outcome: String,
    detail: Option<String>,
    payload: serde_json::Value,
    received_at: DateTime<Utc>,
}

fn parse_outcome(s: &str) -> Result<EventOutcome, DomainError> {
    match s {
        "applied" => Ok(EventOutcome::Applied),
        "already_processed" => Ok(EventOutcome::AlreadyProcessed),
        "ignored" => Ok(EventOutcome::Ignored),
        "needs_attention" => Ok(EventOutcome::NeedsAttention),
        "failed" => Ok(EventOutcome::Failed),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid outcome value: {}", s),
        )),
    }
}

impl TryFrom<EventRow> for PaymentEventRecord {
    type Error = DomainError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(PaymentEventRecord {
            outcome: parse_outcome(&row.outcome)?,
            payment_id: row.payment_id,
            status: row.status,
            reference: row.reference,
            detail: row.detail,
            payload: row.payload,
            received_at: Timestamp::from_datetime(row.received_at),
        })
    }
}

#[async_trait]
impl PaymentEventLog for PostgresPaymentEventLog {
    async fn record(&self, record: PaymentEventRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_events (
                payment_id, status, reference, outcome, detail, payload, received_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (payment_id, status) DO NOTHING
            "#,
        )
        .bind(&record.payment_id)
        .bind(&record.status)
        .bind(&record.reference)
        .bind(record.outcome.as_str())
        .bind(&record.detail)
        .bind(&record.payload)
        .bind(record.received_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to record payment event"))?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }

    async fn find(
        &self,
        payment_id: &str,
        status: &str,
    ) -> Result<Option<PaymentEventRecord>, DomainError> {
        let row: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT payment_id, status, reference, outcome, detail, payload, received_at
            FROM payment_events
            WHERE payment_id = $1 AND status = $2
            "#,
        )
        .bind(payment_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find payment event"))?;

        row.map(PaymentEventRecord::try_from).transpose()
    }
}
