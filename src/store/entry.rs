//! Stored Value Module
//!
//! Defines a single key's bytes plus the expiration metadata the in-memory
//! backend needs to honour TTLs.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Stored Value ==
/// Raw bytes held under one key, with optional expiration.
#[derive(Debug, Clone)]
pub struct StoredValue {
    /// The stored bytes
    pub bytes: Vec<u8>,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredValue {
    // == Constructor ==
    /// Creates a new value that expires after `ttl`, if given.
    pub fn new(bytes: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|ttl| current_timestamp_ms() + ttl.as_millis() as u64);

        Self { bytes, expires_at }
    }

    /// Creates a new value that keeps an absolute expiration timestamp.
    pub fn with_deadline(bytes: Vec<u8>, expires_at: Option<u64>) -> Self {
        Self { bytes, expires_at }
    }

    // == Is Expired ==
    /// Checks if the value has expired.
    ///
    /// A value is expired once the current time reaches the expiration time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// Returns `Some(0)` once the value has expired.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
