//! Object Cache Module
//!
//! Public face of the cache: serializes objects to JSON, stores them under
//! their primary key and keeps the paired status key in step with the
//! freshness protocol.
//!
//! Reads and writes are not isolated from each other: the existence check,
//! the status read and the paired write are separate store calls, so two
//! concurrent writers to one key can both observe the same prior status.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::cache::{CacheStats, MAX_KEY_LENGTH};
use crate::config::StoreConfig;
use crate::connection::{with_deadline, ConnectionManager};
use crate::error::{CacheError, Result};
use crate::status::{status_key, Status};
use crate::store::{Connector, Expiry};

// == Object Cache ==
/// Status-tracked object cache over a key-value store.
pub struct ObjectCache {
    connections: ConnectionManager,
    expiry: Expiry,
    stats: RwLock<CacheStats>,
}

/// Rejects keys the store should never see.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Logs a failed operation without changing its outcome.
fn logged<T>(op: &str, key: &str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        if err.is_partial() {
            warn!(op, key, error = %err, "partial failure, entry needs reconciliation");
        } else {
            error!(op, key, error = %err, "cache operation failed");
        }
    }
    result
}

impl ObjectCache {
    // == Constructors ==
    /// Creates a cache over an existing connection manager.
    pub fn new(connections: ConnectionManager, expiry: Expiry) -> Self {
        Self {
            connections,
            expiry,
            stats: RwLock::new(CacheStats::new()),
        }
    }

    /// Creates a cache connecting through `connector`, with the expiry and
    /// per-call deadline taken from `config`.
    pub fn with_connector(connector: impl Connector + 'static, config: &StoreConfig) -> Self {
        let connections = ConnectionManager::new(connector).with_timeout(config.op_timeout);
        Self::new(connections, config.expiry())
    }

    /// Wraps a store call in the configured deadline.
    async fn bounded<T>(&self, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        with_deadline(self.connections.op_timeout(), fut).await
    }

    // == Set Object ==
    /// Serializes `obj` and stores it under `key`, returning the new status.
    ///
    /// The new status is Unchecked for a fresh key or after Checked/Dirty, and
    /// Dirty when the previous write was never checked. Nothing is written if
    /// serialization fails.
    pub async fn set_object<T>(&self, key: &str, obj: &T) -> Result<Status>
    where
        T: Serialize + ?Sized,
    {
        let result = self.write_object(key, obj).await;
        logged("set_object", key, result)
    }

    async fn write_object<T>(&self, key: &str, obj: &T) -> Result<Status>
    where
        T: Serialize + ?Sized,
    {
        validate_key(key)?;
        let payload = serde_json::to_vec(obj).map_err(|source| CacheError::Serialization {
            key: key.to_string(),
            source,
        })?;

        let store = self.connections.acquire().await?;
        let status_key = status_key(key);

        let current = if self.bounded(store.exists(key)).await? {
            let raw = self.bounded(store.get(&status_key)).await?;
            let current = Status::decode_stored(raw.as_deref());
            if current.is_none() {
                warn!(key, "existing key has no tracked status, treating as fresh");
            }
            current
        } else {
            None
        };

        let next = Status::after_write(current);
        store
            .set_pair(
                (key, payload.as_slice()),
                (status_key.as_str(), next.as_token().as_bytes()),
                self.expiry,
                self.connections.op_timeout(),
            )
            .await?;

        debug!(key, previous = ?current, status = %next, bytes = payload.len(), "object written");
        self.stats.write().await.record_write(next);
        Ok(next)
    }

    // == Get Object ==
    /// Reads and decodes the object under `key`.
    ///
    /// A missing key is `(Status::Empty, None)`, not an error. If decoding
    /// fails the error carries the status that was already read.
    pub async fn get_object<T>(&self, key: &str) -> Result<(Status, Option<T>)>
    where
        T: DeserializeOwned,
    {
        let result = self.read_object(key).await;
        logged("get_object", key, result)
    }

    /// Like [`get_object`](Self::get_object) but decodes into `dest`.
    ///
    /// On a miss `dest` is left untouched.
    pub async fn get_object_into<T>(&self, key: &str, dest: &mut T) -> Result<Status>
    where
        T: DeserializeOwned,
    {
        let (status, value) = self.get_object(key).await?;
        if let Some(value) = value {
            *dest = value;
        }
        Ok(status)
    }

    async fn read_object<T>(&self, key: &str) -> Result<(Status, Option<T>)>
    where
        T: DeserializeOwned,
    {
        validate_key(key)?;
        let store = self.connections.acquire().await?;

        if !self.bounded(store.exists(key)).await? {
            debug!(key, "object not cached");
            self.stats.write().await.record_miss();
            return Ok((Status::Empty, None));
        }

        let status_key = status_key(key);
        let (raw_status, payload) = self.bounded(store.get_pair(&status_key, key)).await?;

        // Expired or deleted between the existence check and the read
        let Some(payload) = payload else {
            self.stats.write().await.record_miss();
            return Ok((Status::Empty, None));
        };

        let status = Status::decode_stored(raw_status.as_deref()).unwrap_or_else(|| {
            warn!(key, "cached object has no tracked status, reporting unchecked");
            Status::Unchecked
        });

        let value = serde_json::from_slice(&payload).map_err(|source| {
            CacheError::Deserialization {
                key: key.to_string(),
                status,
                source,
            }
        })?;

        debug!(key, %status, "object read");
        self.stats.write().await.record_hit();
        Ok((status, Some(value)))
    }

    // == Check Object ==
    /// Marks the current value under `key` as consumed.
    ///
    /// A missing key or an already Checked entry is left alone.
    pub async fn check_object(&self, key: &str) -> Result<()> {
        let result = self.mark_checked(key).await;
        logged("check_object", key, result)
    }

    async fn mark_checked(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let store = self.connections.acquire().await?;

        if !self.bounded(store.exists(key)).await? {
            debug!(key, "nothing to check");
            return Ok(());
        }

        let status_key = status_key(key);
        let raw = self.bounded(store.get(&status_key)).await?;
        let current = Status::decode_stored(raw.as_deref());

        let Some(next) = Status::after_check(current) else {
            debug!(key, "already checked");
            return Ok(());
        };

        // The status key never outlives its payload
        let expiry = if current.is_some() {
            Expiry::Keep
        } else {
            match self.bounded(store.ttl(key)).await? {
                Some(remaining) => Expiry::After(remaining),
                None => Expiry::Never,
            }
        };
        self.bounded(store.set(&status_key, next.as_token().as_bytes(), expiry))
            .await?;

        debug!(key, previous = ?current, "object checked");
        self.stats.write().await.record_check();
        Ok(())
    }

    // == Delete Object ==
    /// Removes `key` and its status key.
    ///
    /// Deleting a missing key succeeds. If the payload is removed but the
    /// status key is not, the error is [`CacheError::PartialDelete`] and the
    /// whole delete can be retried.
    pub async fn del_object(&self, key: &str) -> Result<()> {
        let result = self.remove_object(key).await;
        logged("del_object", key, result)
    }

    async fn remove_object(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let store = self.connections.acquire().await?;
        let status_key = status_key(key);

        store
            .del_pair(key, &status_key, self.connections.op_timeout())
            .await?;

        debug!(key, "object deleted");
        self.stats.write().await.record_delete();
        Ok(())
    }

    // == Raw Strings ==
    /// Stores a string under `key` without touching its status.
    ///
    /// This bypasses status tracking: an object written this way reads back
    /// as Unchecked until the next [`set_object`](Self::set_object).
    pub async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let result = self.write_string(key, value).await;
        logged("set_string", key, result)
    }

    /// Reads a string stored under `key`, ignoring its status.
    pub async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let result = self.read_string(key).await;
        logged("get_string", key, result)
    }

    async fn write_string(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let store = self.connections.acquire().await?;
        self.bounded(store.set(key, value.as_bytes(), self.expiry))
            .await
    }

    async fn read_string(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let store = self.connections.acquire().await?;
        let raw = self.bounded(store.get(key)).await?;
        Ok(raw.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    // == Health ==
    /// Pings the store through the connection manager.
    pub async fn ping(&self) -> Result<()> {
        let store = self.connections.acquire().await?;
        self.bounded(store.ping()).await
    }

    // == Stats ==
    /// Returns a snapshot of the operation counters.
    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    /// The connection manager backing this cache.
    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KvStore, MemoryConnector, MemoryStore};
    use serde::Deserialize;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Student {
        id: u32,
        name: String,
        sex: u8,
    }

    fn ming() -> Student {
        Student {
            id: 1,
            name: "Ming".to_string(),
            sex: 1,
        }
    }

    fn memory_cache() -> (ObjectCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = ObjectCache::with_connector(
            MemoryConnector::new(Arc::clone(&store)),
            &StoreConfig::default(),
        );
        (cache, store)
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (cache, _) = memory_cache();

        let status = cache.set_object("students/3", &ming()).await.unwrap();
        assert_eq!(status, Status::Unchecked);

        let (status, value) = cache.get_object::<Student>("students/3").await.unwrap();
        assert_eq!(status, Status::Unchecked);
        assert_eq!(value, Some(ming()));
    }

    #[tokio::test]
    async fn test_get_missing_is_empty() {
        let (cache, _) = memory_cache();

        let (status, value) = cache.get_object::<Student>("students/9").await.unwrap();
        assert_eq!(status, Status::Empty);
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_get_into_leaves_dest_on_miss() {
        let (cache, _) = memory_cache();
        let mut dest = ming();

        let status = cache.get_object_into("missing", &mut dest).await.unwrap();
        assert_eq!(status, Status::Empty);
        assert_eq!(dest, ming());
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (cache, store) = memory_cache();

        assert_eq!(cache.set_object("k", &1).await.unwrap(), Status::Unchecked);
        assert_eq!(cache.set_object("k", &2).await.unwrap(), Status::Dirty);

        cache.check_object("k").await.unwrap();
        assert_eq!(store.get("k/status").await.unwrap(), Some(b"2".to_vec()));

        // Idempotent
        cache.check_object("k").await.unwrap();
        assert_eq!(store.get("k/status").await.unwrap(), Some(b"2".to_vec()));

        assert_eq!(cache.set_object("k", &3).await.unwrap(), Status::Unchecked);
    }

    #[tokio::test]
    async fn test_dirty_write_resets_to_unchecked() {
        let (cache, _) = memory_cache();

        cache.set_object("k", &1).await.unwrap();
        assert_eq!(cache.set_object("k", &2).await.unwrap(), Status::Dirty);
        assert_eq!(cache.set_object("k", &3).await.unwrap(), Status::Unchecked);
    }

    #[tokio::test]
    async fn test_check_missing_key_is_noop() {
        let (cache, store) = memory_cache();

        cache.check_object("ghost").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_removes_both_keys() {
        let (cache, store) = memory_cache();

        cache.set_object("k", &ming()).await.unwrap();
        cache.del_object("k").await.unwrap();

        assert!(store.is_empty().await);
        let (status, value) = cache.get_object::<Student>("k").await.unwrap();
        assert_eq!(status, Status::Empty);
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_key_succeeds() {
        let (cache, _) = memory_cache();
        cache.del_object("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn test_deserialization_error_carries_status() {
        let (cache, _) = memory_cache();

        cache.set_object("k", &"not a student").await.unwrap();
        let result = cache.get_object::<Student>("k").await;

        match result {
            Err(CacheError::Deserialization { key, status, .. }) => {
                assert_eq!(key, "k");
                assert_eq!(status, Status::Unchecked);
            }
            other => panic!("expected deserialization error, got {:?}", other.map(|r| r.0)),
        }
    }

    #[tokio::test]
    async fn test_invalid_keys_rejected() {
        let (cache, store) = memory_cache();

        let result = cache.set_object("", &1).await;
        assert!(matches!(result, Err(CacheError::InvalidKey(_))));

        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);
        let result = cache.get_object::<u32>(&long_key).await;
        assert!(matches!(result, Err(CacheError::InvalidKey(_))));

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_writes_propagate_expiry() {
        let store = Arc::new(MemoryStore::new());
        let config = StoreConfig {
            expire_time_secs: 60,
            ..StoreConfig::default()
        };
        let cache = ObjectCache::with_connector(MemoryConnector::new(Arc::clone(&store)), &config);

        cache.set_object("k", &1).await.unwrap();

        for key in ["k", "k/status"] {
            let remaining = store.ttl_remaining_ms(key).await.unwrap();
            assert!(remaining <= 60_000 && remaining > 50_000);
        }
    }

    #[tokio::test]
    async fn test_check_keeps_status_ttl() {
        let store = Arc::new(MemoryStore::new());
        let config = StoreConfig {
            expire_time_secs: 60,
            ..StoreConfig::default()
        };
        let cache = ObjectCache::with_connector(MemoryConnector::new(Arc::clone(&store)), &config);

        cache.set_object("k", &1).await.unwrap();
        let before = store.ttl_remaining_ms("k/status").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache.check_object("k").await.unwrap();
        let after = store.ttl_remaining_ms("k/status").await.unwrap();

        assert!(after <= before);
    }

    #[tokio::test]
    async fn test_untracked_key_from_raw_write() {
        let (cache, store) = memory_cache();

        cache.set_string("k", "7").await.unwrap();
        assert!(!store.exists("k/status").await.unwrap());

        let (status, value) = cache.get_object::<u32>("k").await.unwrap();
        assert_eq!(status, Status::Unchecked);
        assert_eq!(value, Some(7));

        // Untracked counts as fresh on write
        assert_eq!(cache.set_object("k", &8).await.unwrap(), Status::Unchecked);
    }

    #[tokio::test]
    async fn test_check_untracked_key_inherits_payload_ttl() {
        let (cache, store) = memory_cache();

        store
            .set("short", b"7", Expiry::After(Duration::from_secs(5)))
            .await
            .unwrap();
        store.set("forever", b"7", Expiry::Never).await.unwrap();

        cache.check_object("short").await.unwrap();
        cache.check_object("forever").await.unwrap();

        let remaining = store.ttl_remaining_ms("short/status").await.unwrap();
        assert!(remaining <= 5_000);
        assert_eq!(store.get("short/status").await.unwrap(), Some(b"2".to_vec()));
        assert!(store.exists("forever/status").await.unwrap());
        assert_eq!(store.ttl_remaining_ms("forever/status").await, None);
    }

    #[tokio::test]
    async fn test_raw_strings() {
        let (cache, _) = memory_cache();

        assert_eq!(cache.get_string("greeting").await.unwrap(), None);
        cache.set_string("greeting", "hello").await.unwrap();
        assert_eq!(
            cache.get_string("greeting").await.unwrap().as_deref(),
            Some("hello")
        );
    }

    #[tokio::test]
    async fn test_stats_counters() {
        let (cache, _) = memory_cache();

        cache.set_object("a", &1).await.unwrap();
        cache.set_object("a", &2).await.unwrap();
        cache.check_object("a").await.unwrap();
        cache.check_object("a").await.unwrap();
        cache.get_object::<u32>("a").await.unwrap();
        cache.get_object::<u32>("b").await.unwrap();
        cache.del_object("a").await.unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.dirty_writes, 1);
        assert_eq!(stats.checks, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.deletes, 1);
    }

    #[tokio::test]
    async fn test_connection_is_reused() {
        let (cache, _) = memory_cache();

        cache.set_object("a", &1).await.unwrap();
        cache.get_object::<u32>("a").await.unwrap();
        cache.ping().await.unwrap();

        assert_eq!(cache.connections().connects(), 1);
    }
}
