//! Center aggregate - a physical location with a hard seat ceiling.
//!
//! # Invariants
//!
//! - `capacity >= 1` and never changes after creation
//! - `current_enrollment` counts Pending and Active seats and never goes
//!   below zero; it only moves through `try_reserve`, `try_occupy` and
//!   `release` (or their storage-level equivalents)
//! - `total_earnings` only grows

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CenterId, CourseId, Timestamp, ValidationError};

/// Upper bound accepted for a single center's capacity.
pub const MAX_CAPACITY: u32 = 10_000;

/// Why a center is not accepting new claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    ManuallyLocked,
    Full,
    DeadlinePassed,
}

impl LockReason {
    /// Short user-facing description.
    pub fn describe(&self) -> &'static str {
        match self {
            LockReason::ManuallyLocked => "center is closed by an administrator",
            LockReason::Full => "center is full",
            LockReason::DeadlinePassed => "enrollment deadline has passed",
        }
    }
}

/// A learning center with a fixed number of seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Center {
    pub id: CenterId,
    pub course_id: CourseId,
    pub name: String,
    pub capacity: u32,
    pub current_enrollment: u32,
    pub is_locked: bool,
    pub enrollment_deadline: Option<Timestamp>,
    pub total_earnings: i64,
    pub owner_contact: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Center {
    /// Creates an empty, unlocked center.
    pub fn create(
        id: CenterId,
        course_id: CourseId,
        name: impl Into<String>,
        capacity: u32,
        owner_contact: impl Into<String>,
        enrollment_deadline: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(ValidationError::out_of_range(
                "capacity",
                1,
                i64::from(MAX_CAPACITY),
                i64::from(capacity),
            ));
        }
        let owner_contact = owner_contact.into();
        if owner_contact.trim().is_empty() {
            return Err(ValidationError::empty_field("owner_contact"));
        }

        Ok(Self {
            id,
            course_id,
            name: name.trim().to_string(),
            capacity,
            current_enrollment: 0,
            is_locked: false,
            enrollment_deadline,
            total_earnings: 0,
            owner_contact,
            created_at: now,
            updated_at: now,
        })
    }

    /// First reason this center refuses claims at `now`, if any.
    ///
    /// Manual lock wins over fullness, fullness over the deadline.
    pub fn lock_reason(&self, now: Timestamp) -> Option<LockReason> {
        if self.is_locked {
            return Some(LockReason::ManuallyLocked);
        }
        if self.current_enrollment >= self.capacity {
            return Some(LockReason::Full);
        }
        match self.enrollment_deadline {
            Some(deadline) if !now.is_before(&deadline) => Some(LockReason::DeadlinePassed),
            _ => None,
        }
    }

    /// Derived lock predicate: manual flag, full, or deadline passed.
    pub fn is_locked_at(&self, now: Timestamp) -> bool {
        self.lock_reason(now).is_some()
    }

    /// Seats not yet taken by a Pending or Active enrollment.
    pub fn spots_remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.current_enrollment)
    }

    /// Takes one seat if the center accepts claims at `now`.
    pub fn try_reserve(&mut self, now: Timestamp) -> Result<(), LockReason> {
        if let Some(reason) = self.lock_reason(now) {
            return Err(reason);
        }
        self.current_enrollment += 1;
        self.updated_at = now;
        Ok(())
    }

    /// Takes one seat on capacity alone, ignoring the manual lock and the
    /// deadline. Used by administrative moves and reinstatements.
    pub fn try_occupy(&mut self, now: Timestamp) -> bool {
        if self.current_enrollment >= self.capacity {
            return false;
        }
        self.current_enrollment += 1;
        self.updated_at = now;
        true
    }

    /// Frees one seat, floored at zero.
    pub fn release(&mut self, now: Timestamp) {
        self.current_enrollment = self.current_enrollment.saturating_sub(1);
        self.updated_at = now;
    }

    /// Adds a confirmed payment to the earnings total.
    pub fn credit(&mut self, amount: i64, now: Timestamp) {
        if amount > 0 {
            self.total_earnings += amount;
            self.updated_at = now;
        }
    }
}

/// True when every center of a course refuses claims. A course without
/// centers is not considered locked.
pub fn course_is_locked(centers: &[Center], now: Timestamp) -> bool {
    !centers.is_empty() && centers.iter().all(|c| c.is_locked_at(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn center(capacity: u32) -> Center {
        Center::create(
            CenterId::new(),
            CourseId::new(),
            "Bonamoussadi Hub",
            capacity,
            "owner@example.com",
            None,
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn create_validates_capacity() {
        let now = Timestamp::now();
        let result = Center::create(CenterId::new(), CourseId::new(), "X", 0, "o", None, now);
        assert!(matches!(result, Err(ValidationError::OutOfRange { .. })));
    }

    #[test]
    fn create_rejects_blank_name() {
        let now = Timestamp::now();
        let result = Center::create(CenterId::new(), CourseId::new(), "  ", 3, "o", None, now);
        assert!(matches!(result, Err(ValidationError::EmptyField { .. })));
    }

    #[test]
    fn new_center_is_open() {
        let c = center(2);
        assert_eq!(c.lock_reason(Timestamp::now()), None);
        assert_eq!(c.spots_remaining(), 2);
    }

    #[test]
    fn manual_lock_locks() {
        let mut c = center(2);
        c.is_locked = true;
        assert_eq!(c.lock_reason(Timestamp::now()), Some(LockReason::ManuallyLocked));
    }

    #[test]
    fn full_center_is_locked() {
        let mut c = center(1);
        let now = Timestamp::now();
        c.try_reserve(now).unwrap();
        assert_eq!(c.lock_reason(now), Some(LockReason::Full));
        assert_eq!(c.try_reserve(now), Err(LockReason::Full));
        assert_eq!(c.current_enrollment, 1);
    }

    #[test]
    fn passed_deadline_locks() {
        let now = Timestamp::now();
        let mut c = center(5);
        c.enrollment_deadline = Some(now.minus_days(1));
        assert_eq!(c.lock_reason(now), Some(LockReason::DeadlinePassed));

        c.enrollment_deadline = Some(now.plus_days(1));
        assert_eq!(c.lock_reason(now), None);
    }

    #[test]
    fn release_floors_at_zero() {
        let mut c = center(1);
        c.release(Timestamp::now());
        assert_eq!(c.current_enrollment, 0);
    }

    #[test]
    fn occupy_ignores_lock_but_not_capacity() {
        let now = Timestamp::now();
        let mut c = center(1);
        c.is_locked = true;
        assert!(c.try_occupy(now));
        assert!(!c.try_occupy(now));
        assert_eq!(c.current_enrollment, 1);
    }

    #[test]
    fn credit_ignores_non_positive_amounts() {
        let now = Timestamp::now();
        let mut c = center(1);
        c.credit(1000, now);
        c.credit(0, now);
        c.credit(-5, now);
        assert_eq!(c.total_earnings, 1000);
    }

    #[test]
    fn course_lock_requires_all_centers_locked() {
        let now = Timestamp::now();
        let mut a = center(1);
        let b = center(1);
        assert!(!course_is_locked(&[], now));
        assert!(!course_is_locked(&[a.clone(), b.clone()], now));

        a.is_locked = true;
        assert!(!course_is_locked(&[a.clone(), b.clone()], now));

        let mut b = b;
        b.try_reserve(now).unwrap();
        assert!(course_is_locked(&[a, b], now));
    }

    proptest! {
        #[test]
        fn counter_stays_within_bounds(capacity in 1u32..20, ops in proptest::collection::vec(any::<bool>(), 0..100)) {
            let now = Timestamp::now();
            let mut c = center(capacity);
            for reserve in ops {
                if reserve {
                    let _ = c.try_reserve(now);
                } else {
                    c.release(now);
                }
                prop_assert!(c.current_enrollment <= c.capacity);
            }
        }
    }
}
