//! Enrollment status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Seat reserved (or purchase started), payment not yet confirmed.
    Pending,

    /// Payment confirmed.
    Active,

    /// Payment failed or the holder was ejected.
    Cancelled,
}

impl EnrollmentStatus {
    /// Whether an enrollment in this status occupies a center seat.
    pub fn holds_seat(&self) -> bool {
        matches!(self, EnrollmentStatus::Pending | EnrollmentStatus::Active)
    }

    /// Database/string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Cancelled => "cancelled",
        }
    }

    /// Parses the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(EnrollmentStatus::Pending),
            "active" => Some(EnrollmentStatus::Active),
            "cancelled" => Some(EnrollmentStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for EnrollmentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use EnrollmentStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Pending) // Purchase restarted
                | (Pending, Active)
                | (Pending, Cancelled)
            // From ACTIVE
                | (Active, Active) // Renewal
                | (Active, Cancelled)
            // From CANCELLED
                | (Cancelled, Pending) // Re-claim
                | (Cancelled, Active) // Unlock or late payment
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use EnrollmentStatus::*;
        match self {
            Pending => vec![Pending, Active, Cancelled],
            Active => vec![Active, Cancelled],
            Cancelled => vec![Pending, Active],
        }
    }
}
