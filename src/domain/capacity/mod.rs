//! Capacity domain module.
//!
//! Centers and their seat counters.
//!
//! # Module Structure
//!
//! - `center` - Center aggregate, lock reasons and the course-level lock
//! - `errors` - CenterError

mod center;
mod errors;

pub use center::{course_is_locked, Center, LockReason, MAX_CAPACITY};
pub use errors::CenterError;
