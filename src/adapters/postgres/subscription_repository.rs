//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::subscription::UserAccount;
use crate::ports::{PaymentApplication, SubscriptionPayment, SubscriptionRepository};

use super::db_error;

const ACCOUNT_COLUMNS: &str = "user_id, role, email, trial_started_at, \
     monthly_subscription_paid_until, subscription_warning_sent_for, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    user_id: String,
    role: Option<String>,
    email: Option<String>,
    trial_started_at: Option<DateTime<Utc>>,
    monthly_subscription_paid_until: Option<DateTime<Utc>>,
    subscription_warning_sent_for: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for UserAccount {
    type Error = DomainError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(UserAccount {
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            role: row.role,
            email: row.email,
            trial_started_at: row.trial_started_at.map(Timestamp::from_datetime),
            paid_until: row.monthly_subscription_paid_until.map(Timestamp::from_datetime),
            warning_sent_for: row.subscription_warning_sent_for.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find(&self, user_id: &UserId) -> Result<Option<UserAccount>, DomainError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM user_accounts WHERE user_id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find user account"))?;

        row.map(UserAccount::try_from).transpose()
    }

    async fn find_or_create(&self, account: &UserAccount) -> Result<UserAccount, DomainError> {
        let row: AccountRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO user_accounts (user_id, role, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                role = COALESCE(EXCLUDED.role, user_accounts.role),
                email = COALESCE(EXCLUDED.email, user_accounts.email)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(account.user_id.as_str())
        .bind(&account.role)
        .bind(&account.email)
        .bind(account.created_at.as_datetime())
        .bind(account.updated_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to upsert user account"))?;

        UserAccount::try_from(row)
    }

    async fn record_trial_start(&self, user_id: &UserId, at: Timestamp) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE user_accounts SET trial_started_at = $2, updated_at = $2
            WHERE user_id = $1 AND trial_started_at IS NULL
            "#,
        )
        .bind(user_id.as_str())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to record trial start"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn apply_payment(
        &self,
        payment: SubscriptionPayment,
    ) -> Result<PaymentApplication, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM user_accounts WHERE user_id = $1 FOR UPDATE",
            ACCOUNT_COLUMNS
        ))
        .bind(payment.user_id.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to lock user account"))?;

        let Some(row) = row else {
            return Ok(PaymentApplication::UnknownUser);
        };
        let mut account = UserAccount::try_from(row)?;
        let paid_until = account.extend(payment.at, &payment.billing);

        let inserted = sqlx::query(
            r#"
            INSERT INTO subscription_payments (payment_id, user_id, amount, paid_until, applied_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (payment_id) DO NOTHING
            "#,
        )
        .bind(&payment.payment_id)
        .bind(payment.user_id.as_str())
        .bind(payment.amount)
        .bind(paid_until.as_datetime())
        .bind(payment.at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to record subscription payment"))?;

        if inserted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(db_error("Failed to roll back transaction"))?;
            return Ok(PaymentApplication::AlreadyApplied);
        }

        sqlx::query(
            r#"
            UPDATE user_accounts SET monthly_subscription_paid_until = $2, updated_at = $3
            WHERE user_id = $1
            "#,
        )
        .bind(payment.user_id.as_str())
        .bind(paid_until.as_datetime())
        .bind(payment.at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to extend subscription"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        Ok(PaymentApplication::Applied { paid_until })
    }

    async fn find_expiring(
        &self,
        now: Timestamp,
        horizon: Timestamp,
    ) -> Result<Vec<UserAccount>, DomainError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM user_accounts
            WHERE monthly_subscription_paid_until >= $1
              AND monthly_subscription_paid_until <= $2
              AND subscription_warning_sent_for IS DISTINCT FROM monthly_subscription_paid_until
            ORDER BY monthly_subscription_paid_until ASC
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(now.as_datetime())
        .bind(horizon.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to find expiring subscriptions"))?;

        rows.into_iter().map(UserAccount::try_from).collect()
    }

    async fn mark_warning_sent(
        &self,
        user_id: &UserId,
        paid_until: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE user_accounts SET subscription_warning_sent_for = $2
            WHERE user_id = $1
              AND monthly_subscription_paid_until = $2
              AND subscription_warning_sent_for IS DISTINCT FROM $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(paid_until.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to mark subscription warning"))?;

        Ok(result.rows_affected() == 1)
    }
}
