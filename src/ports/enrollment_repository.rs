//! Enrollment repository port.
//!
//! Every enrollment transition is written as one [`EnrollmentChange`]: the
//! new enrollment state plus the [`LedgerEffect`] on center counters.
//! Implementations apply both atomically or neither.
//!
//! # Concurrency
//!
//! - Updates carry the version that was read; a stale version yields
//!   [`CommitOutcome::Conflict`] and nothing is written.
//! - Inserts that collide with an existing (user, course) pair also yield
//!   `Conflict`.
//! - Seat-taking effects are conditional updates at the storage layer. A
//!   refused seat yields [`CommitOutcome::SeatUnavailable`] and nothing is
//!   written.

use async_trait::async_trait;

use crate::domain::enrollment::{Enrollment, LedgerEffect};
use crate::domain::foundation::{CenterId, CourseId, DomainError, EnrollmentId, Timestamp, UserId};

/// An enrollment write and its counter effect.
#[derive(Debug, Clone)]
pub struct EnrollmentChange {
    pub enrollment: Enrollment,
    /// Version the caller read; `None` inserts a new record.
    pub expected_version: Option<i32>,
    pub effect: LedgerEffect,
    pub at: Timestamp,
}

impl EnrollmentChange {
    /// Insert a new enrollment.
    pub fn insert(enrollment: Enrollment, effect: LedgerEffect, at: Timestamp) -> Self {
        Self {
            enrollment,
            expected_version: None,
            effect,
            at,
        }
    }

    /// Update an enrollment read at `expected_version`.
    pub fn update(
        enrollment: Enrollment,
        expected_version: i32,
        effect: LedgerEffect,
        at: Timestamp,
    ) -> Self {
        Self {
            enrollment,
            expected_version: Some(expected_version),
            effect,
            at,
        }
    }
}

/// Outcome of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Written; carries the stored state with its new version.
    Applied(Enrollment),
    /// The record changed since it was read (or already exists).
    Conflict,
    /// The effect needed a seat the target center could not give.
    SeatUnavailable { center_id: CenterId },
}

/// Repository port for enrollments and their seat effects.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Atomically persist an enrollment transition with its ledger effect.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure (nothing is written)
    async fn commit(&self, change: EnrollmentChange) -> Result<CommitOutcome, DomainError>;

    async fn find_by_id(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, DomainError>;

    /// The single enrollment for a (user, course) pair.
    async fn find_by_user_and_course(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, DomainError>;

    /// Enrollment whose in-flight or settled payment has this gateway id.
    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Enrollment>, DomainError>;

    /// Enrollment whose in-flight payment was sent with this reference.
    async fn find_by_reference(&self, reference: &str) -> Result<Option<Enrollment>, DomainError>;

    /// Active, non-ejected, center-backed enrollments due in `[now, horizon]`
    /// that were not warned yet.
    async fn find_due_for_warning(
        &self,
        now: Timestamp,
        horizon: Timestamp,
    ) -> Result<Vec<Enrollment>, DomainError>;

    /// Pending or Active, non-ejected, center-backed enrollments due strictly
    /// before `now`. Unpaid claims are included so their seats lapse.
    async fn find_overdue(&self, now: Timestamp) -> Result<Vec<Enrollment>, DomainError>;
}
