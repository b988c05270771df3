//! Connection management for the backing store
//!
//! Lazily opens a store handle, reuses it while it answers pings and replaces
//! it transparently once a ping fails. Acquisition is serialized, so callers
//! racing through a stale window share a single reconnect.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{CacheError, Result};
use crate::store::{Connector, KvStore};

/// Runs `fut`, failing with [`CacheError::Timeout`] if `limit` elapses first.
pub async fn with_deadline<T, F>(limit: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| CacheError::Timeout(limit.as_millis() as u64))?,
        None => fut.await,
    }
}

/// Owns the cached store handle.
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    handle: Mutex<Option<Arc<dyn KvStore>>>,
    op_timeout: Option<Duration>,
    connects: AtomicU64,
}

impl ConnectionManager {
    /// Creates a manager that opens handles through `connector`.
    ///
    /// Nothing is opened until the first [`acquire`](Self::acquire).
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            handle: Mutex::new(None),
            op_timeout: None,
            connects: AtomicU64::new(0),
        }
    }

    /// Bounds each ping and connect by `limit`.
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.op_timeout = limit;
        self
    }

    /// Returns a live handle, reconnecting if the cached one fails its ping.
    ///
    /// Connection failures surface as [`CacheError::Connection`]; nothing is
    /// retried here.
    pub async fn acquire(&self) -> Result<Arc<dyn KvStore>> {
        let mut slot = self.handle.lock().await;

        if let Some(store) = slot.clone() {
            match with_deadline(self.op_timeout, store.ping()).await {
                Ok(()) => return Ok(store),
                Err(err) => {
                    warn!(target_addr = %self.connector.target(), error = %err, "cached connection failed ping, reconnecting");
                    *slot = None;
                }
            }
        }

        let store = with_deadline(self.op_timeout, self.connector.connect())
            .await
            .map_err(|err| match err {
                CacheError::Connection(_) | CacheError::Timeout(_) => err,
                other => CacheError::Connection(other.to_string()),
            })?;

        let count = self.connects.fetch_add(1, Ordering::Relaxed) + 1;
        info!(target_addr = %self.connector.target(), connects = count, "store connection established");

        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Drops the cached handle so the next acquire reconnects.
    pub async fn invalidate(&self) {
        self.handle.lock().await.take();
    }

    /// Returns true if a handle is currently cached.
    pub async fn is_connected(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Number of handles opened so far.
    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::Relaxed)
    }

    /// Deadline applied to individual store calls.
    pub fn op_timeout(&self) -> Option<Duration> {
        self.op_timeout
    }
}
