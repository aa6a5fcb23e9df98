//! Payment settlement handlers.
//!
//! Turns verified gateway notifications into enrollment or subscription
//! transitions, at most once per payment.

mod settle_payment;

pub use settle_payment::{SettlePaymentCommand, SettlePaymentHandler, SettlementReport};
