//! Payment references sent to the gateway and echoed back in notifications.
//!
//! The prefix tells settlement which subsystem a payment belongs to:
//!
//! | Prefix | Target |
//! |--------|--------|
//! | `INFRASTRUCTURE_BASED_<enrollment8>_<millis>` | seat enrollment |
//! | `COURSE_<enrollment8>_<millis>` | conventional course purchase |
//! | `MONTHLY_SUB_<userId>_<millis>` | platform subscription |

use crate::domain::foundation::{EnrollmentId, Timestamp, UserId};

const SEAT_PREFIX: &str = "INFRASTRUCTURE_BASED_";
const COURSE_PREFIX: &str = "COURSE_";
const SUBSCRIPTION_PREFIX: &str = "MONTHLY_SUB_";

/// Which ledger a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementTarget {
    Enrollment,
    Subscription,
}

/// Decoded payment reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentReference {
    Seat {
        enrollment_prefix: String,
        issued_at_millis: i64,
    },
    Course {
        enrollment_prefix: String,
        issued_at_millis: i64,
    },
    Subscription {
        user_id: UserId,
        issued_at_millis: i64,
    },
}

impl PaymentReference {
    /// Reference for a center seat payment.
    pub fn seat(enrollment_id: &EnrollmentId, now: Timestamp) -> Self {
        PaymentReference::Seat {
            enrollment_prefix: enrollment_id.short_prefix(),
            issued_at_millis: now.as_unix_millis(),
        }
    }

    /// Reference for a conventional course purchase.
    pub fn course(enrollment_id: &EnrollmentId, now: Timestamp) -> Self {
        PaymentReference::Course {
            enrollment_prefix: enrollment_id.short_prefix(),
            issued_at_millis: now.as_unix_millis(),
        }
    }

    /// Reference for a monthly subscription payment.
    pub fn subscription(user_id: &UserId, now: Timestamp) -> Self {
        PaymentReference::Subscription {
            user_id: user_id.clone(),
            issued_at_millis: now.as_unix_millis(),
        }
    }

    /// Decodes a reference. Unknown prefixes and malformed suffixes give `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(rest) = raw.strip_prefix(SEAT_PREFIX) {
            let (prefix, millis) = split_suffix(rest)?;
            return Some(PaymentReference::Seat {
                enrollment_prefix: prefix.to_string(),
                issued_at_millis: millis,
            });
        }
        if let Some(rest) = raw.strip_prefix(COURSE_PREFIX) {
            let (prefix, millis) = split_suffix(rest)?;
            return Some(PaymentReference::Course {
                enrollment_prefix: prefix.to_string(),
                issued_at_millis: millis,
            });
        }
        if let Some(rest) = raw.strip_prefix(SUBSCRIPTION_PREFIX) {
            let (user, millis) = split_suffix(rest)?;
            let user_id = UserId::new(user).ok()?;
            return Some(PaymentReference::Subscription {
                user_id,
                issued_at_millis: millis,
            });
        }
        None
    }

    /// Ledger this payment settles.
    pub fn target(&self) -> SettlementTarget {
        match self {
            PaymentReference::Seat { .. } | PaymentReference::Course { .. } => {
                SettlementTarget::Enrollment
            }
            PaymentReference::Subscription { .. } => SettlementTarget::Subscription,
        }
    }
}

impl std::fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentReference::Seat {
                enrollment_prefix,
                issued_at_millis,
            } => write!(f, "{}{}_{}", SEAT_PREFIX, enrollment_prefix, issued_at_millis),
            PaymentReference::Course {
                enrollment_prefix,
                issued_at_millis,
            } => write!(f, "{}{}_{}", COURSE_PREFIX, enrollment_prefix, issued_at_millis),
            PaymentReference::Subscription {
                user_id,
                issued_at_millis,
            } => write!(f, "{}{}_{}", SUBSCRIPTION_PREFIX, user_id, issued_at_millis),
        }
    }
}

// User ids may contain underscores, so the timestamp is taken from the right.
fn split_suffix(rest: &str) -> Option<(&str, i64)> {
    let (head, millis) = rest.rsplit_once('_')?;
    if head.is_empty() {
        return None;
    }
    Some((head, millis.parse().ok()?))
}
