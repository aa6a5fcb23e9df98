//! Recurring obligation: a due date that is warned about, then enforced.
//!
//! Seat billing and the site-wide subscription share this shape. They differ
//! only in what enforcement means: a seat holder is ejected and the seat is
//! freed, while a lapsed subscriber is simply refused at request time.

use serde::Serialize;

use crate::domain::foundation::Timestamp;

use super::BillingPolicy;

/// What happens once an obligation is past due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Enforcement {
    /// The sweep ejects the holder and frees the seat.
    EjectFromSeat,
    /// Access checks refuse the user; the sweep has nothing to do.
    BlockAccess,
}

/// Where an obligation sits relative to its due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ObligationPhase {
    /// No due date is tracked.
    Untracked,
    /// Due date is further away than the warning window.
    Current,
    /// Due date falls inside the warning window.
    DueSoon { days_remaining: u32 },
    /// Due date has passed.
    Overdue { days_overdue: u32 },
}

/// A periodic payment obligation.
pub trait RecurringObligation {
    /// How this obligation is enforced once overdue.
    const ENFORCEMENT: Enforcement;

    /// Current due date, if the obligation is being tracked.
    fn due_at(&self) -> Option<Timestamp>;

    /// Whether the warning for the current due date was already sent.
    fn warned(&self) -> bool;

    /// Whether enforcement already happened.
    fn enforced(&self) -> bool;

    /// Classifies the obligation at `now`.
    fn phase(&self, now: Timestamp, policy: &BillingPolicy) -> ObligationPhase {
        let Some(due) = self.due_at() else {
            return ObligationPhase::Untracked;
        };
        if due.is_before(&now) {
            ObligationPhase::Overdue {
                days_overdue: due.days_elapsed_floor(&now),
            }
        } else if !due.is_after(&policy.warning_horizon(now)) {
            ObligationPhase::DueSoon {
                days_remaining: due.days_until_ceil(&now),
            }
        } else {
            ObligationPhase::Current
        }
    }

    /// True when the due date is within `[now, now + warning_days]`, nothing
    /// was sent yet and enforcement has not happened.
    fn needs_warning(&self, now: Timestamp, policy: &BillingPolicy) -> bool {
        !self.enforced()
            && !self.warned()
            && matches!(self.phase(now, policy), ObligationPhase::DueSoon { .. })
    }

    /// True when the due date is strictly in the past and the obligation is
    /// enforced by the sweep.
    fn needs_enforcement(&self, now: Timestamp) -> bool {
        Self::ENFORCEMENT == Enforcement::EjectFromSeat
            && !self.enforced()
            && self.due_at().map(|due| due.is_before(&now)).unwrap_or(false)
    }
}
