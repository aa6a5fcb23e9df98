//! Center Enrollment - seat capacity and recurring payment lifecycle
//!
//! Learners claim seats at physical centers, pay through a mobile-money
//! gateway, and are billed monthly. Overdue holders are warned, then ejected
//! so their seat returns to the pool. A site-wide trial and subscription gate
//! follows the same due-date pattern.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
