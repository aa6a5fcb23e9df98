//! Center repository port.
//!
//! Seat counters are not written through this port. They move only as the
//! ledger effect of an enrollment commit (see `EnrollmentRepository`).

use async_trait::async_trait;

use crate::domain::capacity::Center;
use crate::domain::foundation::{CenterId, CourseId, DomainError, Timestamp};

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CenterDeletion {
    Deleted,
    NotFound,
    /// Pending or Active enrollments still reference the center.
    InUse { seats_held: u64 },
}

/// Repository port for centers.
#[async_trait]
pub trait CenterRepository: Send + Sync {
    /// Save a new center.
    ///
    /// # Errors
    ///
    /// - `CourseNotFound` if the parent course doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, center: &Center) -> Result<(), DomainError>;

    /// Find a center by its ID.
    async fn find_by_id(&self, id: &CenterId) -> Result<Option<Center>, DomainError>;

    /// All centers of a course, oldest first.
    async fn list_by_course(&self, course_id: &CourseId) -> Result<Vec<Center>, DomainError>;

    /// Set or clear the manual lock. Returns the updated center, or `None`
    /// if it doesn't exist.
    async fn set_locked(
        &self,
        id: &CenterId,
        locked: bool,
        at: Timestamp,
    ) -> Result<Option<Center>, DomainError>;

    /// Delete the center unless an enrollment still holds a seat there.
    /// The check and the delete are atomic.
    async fn delete_if_unused(&self, id: &CenterId) -> Result<CenterDeletion, DomainError>;
}
