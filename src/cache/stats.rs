//! Cache Statistics Module
//!
//! Tracks object cache activity: reads, writes, checks and deletes.

use serde::Serialize;

use crate::status::Status;

// == Cache Stats ==
/// Counters for object cache operations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads that found an object
    pub hits: u64,
    /// Reads that returned Empty
    pub misses: u64,
    /// Successful object writes
    pub writes: u64,
    /// Writes that landed on an unchecked value
    pub dirty_writes: u64,
    /// Checks that moved an entry to Checked
    pub checks: u64,
    /// Successful deletes
    pub deletes: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the read hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Write ==
    /// Counts a write, and a dirty write when the new status is Dirty.
    pub fn record_write(&mut self, status: Status) {
        self.writes += 1;
        if status.is_dirty() {
            self.dirty_writes += 1;
        }
    }

    pub fn record_check(&mut self) {
        self.checks += 1;
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }
}
