//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `capacity` - Centers and seat counters
//! - `enrollment` - Enrollment aggregate and status machine
//! - `billing` - Billing policy and the recurring obligation shared by sweeps
//! - `payment` - Gateway notifications, references and webhook verification
//! - `subscription` - Site-wide trial and monthly fee gate

pub mod billing;
pub mod capacity;
pub mod enrollment;
pub mod foundation;
pub mod payment;
pub mod subscription;
