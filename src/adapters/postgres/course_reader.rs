//! PostgreSQL implementation of CourseReader.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{CourseId, DomainError};
use crate::ports::{CourseReader, CourseSummary};

use super::db_error;

#[derive(Clone)]
pub struct PostgresCourseReader {
    pool: PgPool,
}

impl PostgresCourseReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CourseRow {
    id: Uuid,
    title: String,
    slug: String,
    price: i64,
    is_center_based: bool,
}

impl From<CourseRow> for CourseSummary {
    fn from(row: CourseRow) -> Self {
        CourseSummary {
            id: CourseId::from_uuid(row.id),
            title: row.title,
            slug: row.slug,
            price: row.price,
            center_based: row.is_center_based,
        }
    }
}

#[async_trait]
impl CourseReader for PostgresCourseReader {
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<CourseSummary>, DomainError> {
        let row: Option<CourseRow> = sqlx::query_as(
            "SELECT id, title, slug, price, is_center_based FROM courses WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to find course"))?;

        Ok(row.map(CourseSummary::from))
    }
}
