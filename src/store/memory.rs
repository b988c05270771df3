//! Memory Store Module
//!
//! In-process key-value backend with TTL expiration. Paired operations run
//! under a single lock, so both keys of an entry always change together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::connection::with_deadline;
use crate::error::Result;
use crate::store::{Connector, Expiry, KvStore, StoredValue};

// == Memory Store ==
/// HashMap-backed store honouring per-key expiration.
///
/// Expired keys are dropped lazily on access and in bulk by
/// [`MemoryStore::cleanup_expired`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Cleanup Expired ==
    /// Removes all expired keys.
    ///
    /// Returns the number of keys removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, value| !value.is_expired());
        before - entries.len()
    }

    /// Remaining TTL of a live key in milliseconds.
    ///
    /// `None` when the key is absent or never expires.
    pub async fn ttl_remaining_ms(&self, key: &str) -> Option<u64> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|value| !value.is_expired())
            .and_then(StoredValue::ttl_remaining_ms)
    }

    // == Length ==
    /// Returns the number of stored keys, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Returns the live value under `key`, evicting it first if it has expired.
fn live<'a>(entries: &'a mut HashMap<String, StoredValue>, key: &str) -> Option<&'a StoredValue> {
    if entries.get(key).is_some_and(StoredValue::is_expired) {
        debug!(key, "dropping expired key");
        entries.remove(key);
    }
    entries.get(key)
}

fn write(entries: &mut HashMap<String, StoredValue>, key: &str, value: &[u8], expiry: Expiry) {
    let stored = match expiry {
        Expiry::Never => StoredValue::new(value.to_vec(), None),
        Expiry::After(ttl) => StoredValue::new(value.to_vec(), Some(ttl)),
        Expiry::Keep => {
            let deadline = live(entries, key).and_then(|current| current.expires_at);
            StoredValue::with_deadline(value.to_vec(), deadline)
        }
    };
    entries.insert(key.to_string(), stored);
}

fn remove(entries: &mut HashMap<String, StoredValue>, key: &str) -> bool {
    entries
        .remove(key)
        .is_some_and(|value| !value.is_expired())
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(live(&mut entries, key).is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.write().await;
        Ok(live(&mut entries, key).map(|value| value.bytes.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], expiry: Expiry) -> Result<()> {
        let mut entries = self.entries.write().await;
        write(&mut entries, key, value, expiry);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        Ok(remove(&mut entries, key))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut entries = self.entries.write().await;
        Ok(live(&mut entries, key)
            .and_then(StoredValue::ttl_remaining_ms)
            .map(Duration::from_millis))
    }

    async fn get_pair(
        &self,
        first: &str,
        second: &str,
    ) -> Result<(Option<Vec<u8>>, Option<Vec<u8>>)> {
        let mut entries = self.entries.write().await;
        let first = live(&mut entries, first).map(|value| value.bytes.clone());
        let second = live(&mut entries, second).map(|value| value.bytes.clone());
        Ok((first, second))
    }

    async fn set_pair(
        &self,
        first: (&str, &[u8]),
        second: (&str, &[u8]),
        expiry: Expiry,
        deadline: Option<Duration>,
    ) -> Result<()> {
        // The deadline only covers taking the lock; both writes then land together
        let mut entries = with_deadline(deadline, async { Ok(self.entries.write().await) }).await?;
        write(&mut entries, first.0, first.1, expiry);
        write(&mut entries, second.0, second.1, expiry);
        Ok(())
    }

    async fn del_pair(&self, first: &str, second: &str, deadline: Option<Duration>) -> Result<()> {
        let mut entries = with_deadline(deadline, async { Ok(self.entries.write().await) }).await?;
        remove(&mut entries, first);
        remove(&mut entries, second);
        Ok(())
    }
}

// == Memory Connector ==
/// Hands out the same shared [`MemoryStore`] on every connect.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
}

impl MemoryConnector {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// The store every connection points at.
    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Arc<dyn KvStore>> {
        Ok(self.store.clone() as Arc<dyn KvStore>)
    }

    fn target(&self) -> String {
        "memory".to_string()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_set_and_get() {
        let store = MemoryStore::new();

        store.set("key1", b"value1", Expiry::Never).await.unwrap();

        assert_eq!(store.get("key1").await.unwrap(), Some(b"value1".to_vec()));
        assert!(store.exists("key1").await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_get_nonexistent() {
        let store = MemoryStore::new();

        assert_eq!(store.get("nonexistent").await.unwrap(), None);
        assert!(!store.exists("nonexistent").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_delete_is_idempotent() {
        let store = MemoryStore::new();

        store.set("key1", b"value1", Expiry::Never).await.unwrap();
        assert!(store.del("key1").await.unwrap());
        assert!(!store.del("key1").await.unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_overwrite() {
        let store = MemoryStore::new();

        store.set("key1", b"value1", Expiry::Never).await.unwrap();
        store.set("key1", b"value2", Expiry::Never).await.unwrap();

        assert_eq!(store.get("key1").await.unwrap(), Some(b"value2".to_vec()));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_ttl_expiration() {
        let store = MemoryStore::new();

        store
            .set("key1", b"value1", Expiry::After(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(store.exists("key1").await.unwrap());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(!store.exists("key1").await.unwrap());
        assert_eq!(store.get("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_keep_expiry() {
        let store = MemoryStore::new();

        store
            .set("key1", b"1", Expiry::After(Duration::from_secs(60)))
            .await
            .unwrap();
        store.set("key1", b"2", Expiry::Keep).await.unwrap();

        let remaining = store.ttl_remaining_ms("key1").await.unwrap();
        assert!(remaining <= 60_000);
        assert!(remaining > 50_000);
        assert_eq!(store.get("key1").await.unwrap(), Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn test_store_keep_on_missing_key_never_expires() {
        let store = MemoryStore::new();

        store.set("key1", b"1", Expiry::Keep).await.unwrap();

        assert!(store.exists("key1").await.unwrap());
        assert_eq!(store.ttl_remaining_ms("key1").await, None);
    }

    #[tokio::test]
    async fn test_store_ttl_query() {
        let store = MemoryStore::new();

        store
            .set("short", b"1", Expiry::After(Duration::from_secs(5)))
            .await
            .unwrap();
        store.set("forever", b"1", Expiry::Never).await.unwrap();

        let remaining = store.ttl("short").await.unwrap().unwrap();
        assert!(remaining <= Duration::from_secs(5));
        assert!(remaining > Duration::from_secs(4));
        assert_eq!(store.ttl("forever").await.unwrap(), None);
        assert_eq!(store.ttl("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_pairs() {
        let store = MemoryStore::new();

        store
            .set_pair(
                ("a", b"payload".as_slice()),
                ("a/status", b"1".as_slice()),
                Expiry::Never,
                None,
            )
            .await
            .unwrap();
        let (status, payload) = store.get_pair("a/status", "a").await.unwrap();
        assert_eq!(status, Some(b"1".to_vec()));
        assert_eq!(payload, Some(b"payload".to_vec()));

        store.del_pair("a", "a/status", None).await.unwrap();
        assert!(store.is_empty().await);

        // Deleting an absent pair is a no-op
        store.del_pair("a", "a/status", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_cleanup_expired() {
        let store = MemoryStore::new();

        store
            .set("key1", b"value1", Expiry::After(Duration::from_millis(50)))
            .await
            .unwrap();
        store
            .set("key2", b"value2", Expiry::After(Duration::from_secs(10)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(store.cleanup_expired().await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.exists("key2").await.unwrap());
    }

    #[tokio::test]
    async fn test_connector_shares_one_store() {
        let connector = MemoryConnector::default();

        let first = connector.connect().await.unwrap();
        first.set("shared", b"x", Expiry::Never).await.unwrap();

        let second = connector.connect().await.unwrap();
        assert!(second.exists("shared").await.unwrap());
        assert_eq!(connector.store().len().await, 1);
        assert_eq!(connector.target(), "memory");
    }
}
