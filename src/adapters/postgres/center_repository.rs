//! PostgreSQL implementation of CenterRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::capacity::Center;
use crate::domain::foundation::{CenterId, CourseId, DomainError, ErrorCode, Timestamp};
use crate::ports::{CenterDeletion, CenterRepository};

use super::db_error;

const CENTER_COLUMNS: &str = "id, course_id, name, capacity, current_enrollment, is_locked, \
     enrollment_deadline, total_earnings, owner_contact, created_at, updated_at";

/// PostgreSQL implementation of the CenterRepository port.
#[derive(Clone)]
pub struct PostgresCenterRepository {
    pool: PgPool,
}

impl PostgresCenterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a center.
#[derive(Debug, sqlx::FromRow)]
struct CenterRow {
    id: Uuid,
    course_id: Uuid,
    name: String,
    capacity: i32,
    current_enrollment: i32,
    is_locked: bool,
    enrollment_deadline: Option<DateTime<Utc>>,
    total_earnings: i64,
    owner_contact: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CenterRow> for Center {
    type Error = DomainError;

    fn try_from(row: CenterRow) -> Result<Self, Self::Error> {
        let counter = |name: &str, value: i32| {
            u32::try_from(value).map_err(|_| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid {} for center {}: {}", name, row.id, value),
                )
            })
        };

        Ok(Center {
            id: CenterId::from_uuid(row.id),
            course_id: CourseId::from_uuid(row.course_id),
            name: row.name.clone(),
            capacity: counter("capacity", row.capacity)?,
            current_enrollment: counter("current_enrollment", row.current_enrollment)?,
            is_locked: row.is_locked,
            enrollment_deadline: row.enrollment_deadline.map(Timestamp::from_datetime),
            total_earnings: row.total_earnings,
            owner_contact: row.owner_contact.clone(),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn to_i32(field: &str, value: u32) -> Result<i32, DomainError> {
    i32::try_from(value).map_err(|_| DomainError::validation(field, "value too large"))
}

#[async_trait]
impl CenterRepository for PostgresCenterRepository {
    async fn insert(&self, center: &Center) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO centers (
                id, course_id, name, capacity, current_enrollment, is_locked,
                enrollment_deadline, total_earnings, owner_contact, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(center.id.as_uuid())
        .bind(center.course_id.as_uuid())
        .bind(&center.name)
        .bind(to_i32("capacity", center.capacity)?)
        .bind(to_i32("current_enrollment", center.current_enrollment)?)
        .bind(center.is_locked)
        .bind(center.enrollment_deadline.map(|d| *d.as_datetime()))
        .bind(center.total_earnings)
        .bind(&center.owner_contact)
        .bind(center.created_at.as_datetime())
        .bind(center.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return DomainError::new(
                        ErrorCode::CourseNotFound,
                        format!("Course not found: {}", center.course_id),
                    );
                }
            }
            db_error("Failed to insert center")(e)
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &CenterId) -> Result<Option<Center>, DomainError> {
        let row: Option<CenterRow> =
            sqlx::query_as(&format!("SELECT {} FROM centers WHERE id = $1", CENTER_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to find center"))?;

        row.map(Center::try_from).transpose()
    }

    async fn list_by_course(&self, course_id: &CourseId) -> Result<Vec<Center>, DomainError> {
        let rows: Vec<CenterRow> = sqlx::query_as(&format!(
            "SELECT {} FROM centers WHERE course_id = $1 ORDER BY created_at ASC",
            CENTER_COLUMNS
        ))
        .bind(course_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list centers"))?;

        rows.into_iter().map(Center::try_from).collect()
    }

    async fn set_locked(
        &self,
        id: &CenterId,
        locked: bool,
        at: Timestamp,
    ) -> Result<Option<Center>, DomainError> {
        let row: Option<CenterRow> = sqlx::query_as(&format!(
            "UPDATE centers SET is_locked = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            CENTER_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(locked)
        .bind(at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to update center lock"))?;

        row.map(Center::try_from).transpose()
    }

    async fn delete_if_unused(&self, id: &CenterId) -> Result<CenterDeletion, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        // Row lock blocks concurrent reservations until we are done
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM centers WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("Failed to lock center"))?;
        if exists.is_none() {
            return Ok(CenterDeletion::NotFound);
        }

        let (seats_held,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM enrollments WHERE center_id = $1 AND status IN ('pending', 'active')",
        )
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to count seat holders"))?;

        if seats_held > 0 {
            return Ok(CenterDeletion::InUse {
                seats_held: seats_held as u64,
            });
        }

        sqlx::query("DELETE FROM centers WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete center"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        Ok(CenterDeletion::Deleted)
    }
}
