//! PostgreSQL implementation of EnrollmentRepository.
//!
//! Each commit runs in one transaction: the versioned enrollment write, then
//! the seat effect as conditional counter updates. A refused seat rolls the
//! enrollment write back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::enrollment::{Enrollment, EnrollmentStatus, LedgerEffect};
use crate::domain::foundation::{
    CenterId, CourseId, DomainError, EnrollmentId, ErrorCode, Timestamp, UserId,
};
use crate::ports::{CommitOutcome, EnrollmentChange, EnrollmentRepository};

use super::db_error;

const ENROLLMENT_COLUMNS: &str = "id, user_id, course_id, center_id, status, amount, \
     transaction_id, payment_reference, settled_payment_id, next_payment_due, paid_at, \
     warning_email_sent, is_ejected, ejection_count, ejected_at, version, created_at, updated_at";

/// PostgreSQL implementation of the EnrollmentRepository port.
#[derive(Clone)]
pub struct PostgresEnrollmentRepository {
    pool: PgPool,
}

impl PostgresEnrollmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an enrollment.
#[derive(Debug, sqlx::FromRow)]
struct EnrollmentRow {
    id: Uuid,
    user_id: String,
    course_id: Uuid,
    center_id: Option<Uuid>,
    status: String,
    amount: i64,
    transaction_id: Option<String>,
    payment_reference: Option<String>,
    settled_payment_id: Option<String>,
    next_payment_due: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    warning_email_sent: bool,
    is_ejected: bool,
    ejection_count: i32,
    ejected_at: Option<DateTime<Utc>>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = DomainError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        let status = EnrollmentStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid enrollment status value: {}", row.status),
            )
        })?;
        let user_id = UserId::new(row.user_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
        })?;
        let ejection_count = u32::try_from(row.ejection_count).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid ejection_count: {}", row.ejection_count),
            )
        })?;

        Ok(Enrollment {
            id: EnrollmentId::from_uuid(row.id),
            user_id,
            course_id: CourseId::from_uuid(row.course_id),
            center_id: row.center_id.map(CenterId::from_uuid),
            status,
            amount: row.amount,
            transaction_id: row.transaction_id,
            payment_reference: row.payment_reference,
            settled_payment_id: row.settled_payment_id,
            next_payment_due: row.next_payment_due.map(Timestamp::from_datetime),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            warning_email_sent: row.warning_email_sent,
            is_ejected: row.is_ejected,
            ejection_count,
            ejected_at: row.ejected_at.map(Timestamp::from_datetime),
            version: row.version,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn ejection_count(enrollment: &Enrollment) -> Result<i32, DomainError> {
    i32::try_from(enrollment.ejection_count)
        .map_err(|_| DomainError::validation("ejection_count", "value too large"))
}

/// Inserts a new enrollment. Returns false when the (user, course) pair
/// already has one.
async fn insert_enrollment(
    tx: &mut Transaction<'_, Postgres>,
    e: &Enrollment,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r#"
        INSERT INTO enrollments (
            id, user_id, course_id, center_id, status, amount, transaction_id,
            payment_reference, settled_payment_id, next_payment_due, paid_at,
            warning_email_sent, is_ejected, ejection_count, ejected_at, version,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, 1, $16, $17)
        ON CONFLICT ON CONSTRAINT enrollments_user_course_key DO NOTHING
        "#,
    )
    .bind(e.id.as_uuid())
    .bind(e.user_id.as_str())
    .bind(e.course_id.as_uuid())
    .bind(e.center_id.map(|c| *c.as_uuid()))
    .bind(e.status.as_str())
    .bind(e.amount)
    .bind(&e.transaction_id)
    .bind(&e.payment_reference)
    .bind(&e.settled_payment_id)
    .bind(e.next_payment_due.map(|t| *t.as_datetime()))
    .bind(e.paid_at.map(|t| *t.as_datetime()))
    .bind(e.warning_email_sent)
    .bind(e.is_ejected)
    .bind(ejection_count(e)?)
    .bind(e.ejected_at.map(|t| *t.as_datetime()))
    .bind(e.created_at.as_datetime())
    .bind(e.updated_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to insert enrollment"))?;

    Ok(result.rows_affected() == 1)
}

/// Updates an enrollment read at `expected_version`. Returns false on a
/// version mismatch.
async fn update_enrollment(
    tx: &mut Transaction<'_, Postgres>,
    e: &Enrollment,
    expected_version: i32,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r#"
        UPDATE enrollments SET
            center_id = $3,
            status = $4,
            amount = $5,
            transaction_id = $6,
            payment_reference = $7,
            settled_payment_id = $8,
            next_payment_due = $9,
            paid_at = $10,
            warning_email_sent = $11,
            is_ejected = $12,
            ejection_count = $13,
            ejected_at = $14,
            updated_at = $15,
            version = version + 1
        WHERE id = $1 AND version = $2
        "#,
    )
    .bind(e.id.as_uuid())
    .bind(expected_version)
    .bind(e.center_id.map(|c| *c.as_uuid()))
    .bind(e.status.as_str())
    .bind(e.amount)
    .bind(&e.transaction_id)
    .bind(&e.payment_reference)
    .bind(&e.settled_payment_id)
    .bind(e.next_payment_due.map(|t| *t.as_datetime()))
    .bind(e.paid_at.map(|t| *t.as_datetime()))
    .bind(e.warning_email_sent)
    .bind(e.is_ejected)
    .bind(ejection_count(e)?)
    .bind(e.ejected_at.map(|t| *t.as_datetime()))
    .bind(e.updated_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to update enrollment"))?;

    Ok(result.rows_affected() == 1)
}

/// Takes a seat if the center is open: not locked, not full, deadline not
/// passed. The comparison and the increment are one statement.
async fn reserve_seat(
    tx: &mut Transaction<'_, Postgres>,
    center_id: CenterId,
    at: Timestamp,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r#"
        UPDATE centers
        SET current_enrollment = current_enrollment + 1, updated_at = $2
        WHERE id = $1
          AND current_enrollment < capacity
          AND NOT is_locked
          AND (enrollment_deadline IS NULL OR enrollment_deadline > $2)
        "#,
    )
    .bind(center_id.as_uuid())
    .bind(at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to reserve seat"))?;

    Ok(result.rows_affected() == 1)
}

/// Takes a seat on capacity alone.
async fn occupy_seat(
    tx: &mut Transaction<'_, Postgres>,
    center_id: CenterId,
    at: Timestamp,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r#"
        UPDATE centers
        SET current_enrollment = current_enrollment + 1, updated_at = $2
        WHERE id = $1 AND current_enrollment < capacity
        "#,
    )
    .bind(center_id.as_uuid())
    .bind(at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to occupy seat"))?;

    Ok(result.rows_affected() == 1)
}

async fn release_seat(
    tx: &mut Transaction<'_, Postgres>,
    center_id: CenterId,
    at: Timestamp,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        UPDATE centers
        SET current_enrollment = GREATEST(current_enrollment - 1, 0), updated_at = $2
        WHERE id = $1
        "#,
    )
    .bind(center_id.as_uuid())
    .bind(at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to release seat"))?;

    Ok(())
}

async fn credit_earnings(
    tx: &mut Transaction<'_, Postgres>,
    center_id: CenterId,
    amount: i64,
    at: Timestamp,
) -> Result<(), DomainError> {
    if amount <= 0 {
        return Ok(());
    }
    sqlx::query(
        "UPDATE centers SET total_earnings = total_earnings + $2, updated_at = $3 WHERE id = $1",
    )
    .bind(center_id.as_uuid())
    .bind(amount)
    .bind(at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_error("Failed to credit earnings"))?;

    Ok(())
}

/// Applies the counter side of a change. Returns the center that refused a
/// seat, if any.
async fn apply_effect(
    tx: &mut Transaction<'_, Postgres>,
    effect: LedgerEffect,
    at: Timestamp,
) -> Result<Option<CenterId>, DomainError> {
    match effect {
        LedgerEffect::None => {}
        LedgerEffect::Reserve { center_id } => {
            if !reserve_seat(tx, center_id, at).await? {
                return Ok(Some(center_id));
            }
        }
        LedgerEffect::Release { center_id } => release_seat(tx, center_id, at).await?,
        LedgerEffect::Credit { center_id, amount } => {
            credit_earnings(tx, center_id, amount, at).await?
        }
        LedgerEffect::Restore { center_id } => {
            if !occupy_seat(tx, center_id, at).await? {
                return Ok(Some(center_id));
            }
        }
        LedgerEffect::RestoreAndCredit { center_id, amount } => {
            if !occupy_seat(tx, center_id, at).await? {
                return Ok(Some(center_id));
            }
            credit_earnings(tx, center_id, amount, at).await?;
        }
        LedgerEffect::Transfer { from, to } => {
            if !occupy_seat(tx, to, at).await? {
                return Ok(Some(to));
            }
            release_seat(tx, from, at).await?;
        }
    }
    Ok(None)
}

#[async_trait]
impl EnrollmentRepository for PostgresEnrollmentRepository {
    async fn commit(&self, change: EnrollmentChange) -> Result<CommitOutcome, DomainError> {
        let EnrollmentChange {
            mut enrollment,
            expected_version,
            effect,
            at,
        } = change;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let written = match expected_version {
            None => insert_enrollment(&mut tx, &enrollment).await?,
            Some(version) => update_enrollment(&mut tx, &enrollment, version).await?,
        };
        if !written {
            tx.rollback()
                .await
                .map_err(db_error("Failed to roll back transaction"))?;
            return Ok(CommitOutcome::Conflict);
        }

        if let Some(center_id) = apply_effect(&mut tx, effect, at).await? {
            tx.rollback()
                .await
                .map_err(db_error("Failed to roll back transaction"))?;
            return Ok(CommitOutcome::SeatUnavailable { center_id });
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        enrollment.version = expected_version.map(|v| v + 1).unwrap_or(1);
        Ok(CommitOutcome::Applied(enrollment))
    }

    async fn find_by_id(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, DomainError> {
        let row: Option<EnrollmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM enrollments WHERE id = $1",
            ENROLLMENT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find enrollment"))?;

        row.map(Enrollment::try_from).transpose()
    }

    async fn find_by_user_and_course(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, DomainError> {
        let row: Option<EnrollmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM enrollments WHERE user_id = $1 AND course_id = $2",
            ENROLLMENT_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(course_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find enrollment"))?;

        row.map(Enrollment::try_from).transpose()
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Enrollment>, DomainError> {
        let row: Option<EnrollmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM enrollments WHERE transaction_id = $1 OR settled_payment_id = $1 LIMIT 1",
            ENROLLMENT_COLUMNS
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find enrollment by payment"))?;

        row.map(Enrollment::try_from).transpose()
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Enrollment>, DomainError> {
        let row: Option<EnrollmentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM enrollments WHERE payment_reference = $1 LIMIT 1",
            ENROLLMENT_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find enrollment by reference"))?;

        row.map(Enrollment::try_from).transpose()
    }

    async fn find_due_for_warning(
        &self,
        now: Timestamp,
        horizon: Timestamp,
    ) -> Result<Vec<Enrollment>, DomainError> {
        let rows: Vec<EnrollmentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM enrollments
            WHERE status = 'active'
              AND is_ejected = FALSE
              AND center_id IS NOT NULL
              AND warning_email_sent = FALSE
              AND next_payment_due >= $1
              AND next_payment_due <= $2
            ORDER BY next_payment_due ASC
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(now.as_datetime())
        .bind(horizon.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to find enrollments due for warning"))?;

        rows.into_iter().map(Enrollment::try_from).collect()
    }

    async fn find_overdue(&self, now: Timestamp) -> Result<Vec<Enrollment>, DomainError> {
        let rows: Vec<EnrollmentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM enrollments
            WHERE status IN ('pending', 'active')
              AND is_ejected = FALSE
              AND center_id IS NOT NULL
              AND next_payment_due < $1
            ORDER BY next_payment_due ASC
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to find overdue enrollments"))?;

        rows.into_iter().map(Enrollment::try_from).collect()
    }
}
