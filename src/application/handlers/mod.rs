//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations. Each
//! handler takes its ports as `Arc<dyn Port>` and exposes one `handle`.

pub mod billing;
pub mod capacity;
pub mod enrollment;
pub mod settlement;
pub mod subscription;

mod notify;

pub use billing::*;
pub use capacity::*;
pub use enrollment::*;
pub use settlement::*;
pub use subscription::*;
