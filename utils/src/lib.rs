//! Shared infrastructure utilities for Portal.
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename) used by the
//!   on-disk credential store

pub mod atomic_write;

pub use atomic_write::{atomic_write, backup_path, recover_backup, remove_if_exists};
