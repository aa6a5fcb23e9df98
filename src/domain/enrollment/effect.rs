//! Seat counter effects that accompany enrollment transitions.
//!
//! A transition and its effect are persisted together or not at all.

use serde::Serialize;

use crate::domain::foundation::CenterId;

/// What a transition does to center counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEffect {
    /// Counters untouched.
    None,

    /// Take a seat; refused when the center is locked, full, or past its
    /// deadline.
    Reserve { center_id: CenterId },

    /// Give a seat back, floored at zero.
    Release { center_id: CenterId },

    /// Add a confirmed payment to the center's earnings.
    Credit { center_id: CenterId, amount: i64 },

    /// Take a seat on capacity alone.
    Restore { center_id: CenterId },

    /// Take a seat on capacity alone and credit the payment.
    RestoreAndCredit { center_id: CenterId, amount: i64 },

    /// Move a held seat between centers; the target is checked on capacity
    /// alone.
    Transfer { from: CenterId, to: CenterId },
}

impl LedgerEffect {
    /// True when applying the effect can be refused for lack of a seat.
    pub fn needs_seat(&self) -> bool {
        matches!(
            self,
            LedgerEffect::Reserve { .. }
                | LedgerEffect::Restore { .. }
                | LedgerEffect::RestoreAndCredit { .. }
                | LedgerEffect::Transfer { .. }
        )
    }

    /// Center whose seat is being taken, if any.
    pub fn seat_target(&self) -> Option<CenterId> {
        match self {
            LedgerEffect::Reserve { center_id }
            | LedgerEffect::Restore { center_id }
            | LedgerEffect::RestoreAndCredit { center_id, .. } => Some(*center_id),
            LedgerEffect::Transfer { to, .. } => Some(*to),
            _ => None,
        }
    }
}
