//! In-process storage adapter.
//!
//! Used by tests and local development when no database is configured.

mod store;

pub use store::InMemoryStore;
