//! Course reader port.
//!
//! Course content is managed elsewhere; enrollment only needs the price,
//! whether the course is center-backed, and display fields.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::foundation::{CourseId, DomainError};

/// The parts of a course enrollment cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseSummary {
    pub id: CourseId,
    pub title: String,
    pub slug: String,
    /// Price per billing period, in currency units.
    pub price: i64,
    /// Whether students must claim a seat at a physical center.
    pub center_based: bool,
}

/// Read-only access to courses.
#[async_trait]
pub trait CourseReader: Send + Sync {
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<CourseSummary>, DomainError>;
}
