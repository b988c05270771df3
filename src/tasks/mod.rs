//! Background Tasks Module
//!
//! Contains background tasks that run periodically during service operation.
//!
//! # Tasks
//! - Expiry Cleanup: Purges expired keys from the in-memory backend

mod cleanup;

pub use cleanup::spawn_cleanup_task;
