//! Notification adapters.
//!
//! Email and SMS delivery live outside this service. `TracingNotifier`
//! emits each notification as a structured log line for the delivery
//! pipeline to pick up; `RecordingNotifier` keeps them in memory for tests.

mod recording;
mod tracing_notifier;

pub use recording::RecordingNotifier;
pub use tracing_notifier::TracingNotifier;
