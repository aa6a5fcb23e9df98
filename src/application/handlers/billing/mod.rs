//! Recurring billing handlers.

mod run_billing_sweep;

pub use run_billing_sweep::{
    BillingSweepResult, RunBillingSweepCommand, RunBillingSweepHandler, SeatSweepCounts,
    SubscriptionSweepCounts,
};
