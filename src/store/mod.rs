//! Store Module
//!
//! The key-value contract the object cache runs against, plus the backends
//! that implement it.
//!
//! # Backends
//! - [`MemoryStore`]: in-process map with TTL expiry
//! - [`RedisStore`]: a Redis server over a multiplexed async connection

mod entry;
mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

use crate::connection::with_deadline;
use crate::error::{CacheError, Result};

pub use entry::{current_timestamp_ms, StoredValue};
pub use memory::{MemoryConnector, MemoryStore};
pub use redis_store::{RedisConnector, RedisStore};

// == Expiry ==
/// Expiration to apply when writing a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The key never expires
    Never,
    /// The key expires after the given duration
    After(Duration),
    /// Keep whatever expiration the key already has
    Keep,
}

impl Expiry {
    /// Builds an expiry from a number of seconds, where `0` disables it.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            Expiry::Never
        } else {
            Expiry::After(Duration::from_secs(secs))
        }
    }
}

// == KvStore ==
/// Minimal key-value contract of a backing store.
///
/// Deleting an absent key is not an error. The paired writes default to two
/// independent calls, each bounded by the given deadline; backends with a
/// native multi-key primitive override them so both keys change together.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Liveness probe. An error marks the handle as dead.
    async fn ping(&self) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: &[u8], expiry: Expiry) -> Result<()>;

    /// Removes a key. Returns whether it was present.
    async fn del(&self, key: &str) -> Result<bool>;

    /// Remaining lifetime of a key.
    ///
    /// `None` when the key never expires or is absent.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Reads two keys.
    async fn get_pair(
        &self,
        first: &str,
        second: &str,
    ) -> Result<(Option<Vec<u8>>, Option<Vec<u8>>)> {
        let first = self.get(first).await?;
        let second = self.get(second).await?;
        Ok((first, second))
    }

    /// Writes two keys, `first` before `second`.
    ///
    /// If `second` fails or misses `deadline` after `first` landed the error
    /// is [`CacheError::PartialWrite`].
    async fn set_pair(
        &self,
        first: (&str, &[u8]),
        second: (&str, &[u8]),
        expiry: Expiry,
        deadline: Option<Duration>,
    ) -> Result<()> {
        with_deadline(deadline, self.set(first.0, first.1, expiry)).await?;
        with_deadline(deadline, self.set(second.0, second.1, expiry))
            .await
            .map_err(|source| CacheError::PartialWrite {
                key: first.0.to_string(),
                source: Box::new(source),
            })
    }

    /// Deletes two keys, `first` before `second`.
    ///
    /// If `second` fails or misses `deadline` after `first` was removed the
    /// error is [`CacheError::PartialDelete`].
    async fn del_pair(&self, first: &str, second: &str, deadline: Option<Duration>) -> Result<()> {
        with_deadline(deadline, self.del(first)).await?;
        with_deadline(deadline, self.del(second))
            .await
            .map(|_| ())
            .map_err(|source| CacheError::PartialDelete {
                key: first.to_string(),
                source: Box::new(source),
            })
    }
}

// == Connector ==
/// Builds fresh store handles for the connection manager.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new handle. Failures are [`CacheError::Connection`].
    async fn connect(&self) -> Result<std::sync::Arc<dyn KvStore>>;

    /// Human-readable target, used in logs.
    fn target(&self) -> String;
}
