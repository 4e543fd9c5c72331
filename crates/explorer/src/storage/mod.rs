//! Durable lock storage.
//!
//! This module persists the two lock tiers as JSON files in the data
//! directory.

pub mod lock_file;

pub use lock_file::{LockFileStore, PERMANENT_LOCKS_FILE, TEMPORARY_LOCKS_FILE};
