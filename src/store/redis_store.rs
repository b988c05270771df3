//! Redis Store Module
//!
//! Backend over a Redis server. Paired writes, reads and deletes are sent as
//! `MULTI`/`EXEC` pipelines so the payload and status keys move together.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Cmd, IntoConnectionInfo};
use tracing::debug;

use crate::config::StoreConfig;
use crate::connection::with_deadline;
use crate::error::{CacheError, Result};
use crate::store::{Connector, Expiry, KvStore};

/// Builds a `SET` carrying the requested expiration.
fn set_cmd(key: &str, value: &[u8], expiry: Expiry) -> Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    match expiry {
        Expiry::Never => {}
        Expiry::After(ttl) => {
            cmd.arg("PX").arg((ttl.as_millis() as u64).max(1));
        }
        Expiry::Keep => {
            cmd.arg("KEEPTTL");
        }
    }
    cmd
}

// == Redis Store ==
/// A live Redis handle.
///
/// The multiplexed connection is cheap to clone, so each call works on its
/// own clone.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|err| CacheError::Connection(err.to_string()))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let found: bool = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(found)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], expiry: Expiry) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = set_cmd(key, value, expiry).query_async(&mut conn).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn.clone();
        // -1 means no expiry, -2 means no key
        let millis: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }

    async fn get_pair(
        &self,
        first: &str,
        second: &str,
    ) -> Result<(Option<Vec<u8>>, Option<Vec<u8>>)> {
        let mut conn = self.conn.clone();
        let values: (Option<Vec<u8>>, Option<Vec<u8>>) = redis::pipe()
            .atomic()
            .cmd("GET")
            .arg(first)
            .cmd("GET")
            .arg(second)
            .query_async(&mut conn)
            .await?;
        Ok(values)
    }

    async fn set_pair(
        &self,
        first: (&str, &[u8]),
        second: (&str, &[u8]),
        expiry: Expiry,
        deadline: Option<Duration>,
    ) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .add_command(set_cmd(first.0, first.1, expiry))
            .add_command(set_cmd(second.0, second.1, expiry));

        with_deadline(deadline, async {
            let _: () = pipe.query_async(&mut conn).await?;
            Ok::<(), CacheError>(())
        })
        .await
    }

    async fn del_pair(&self, first: &str, second: &str, deadline: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().cmd("DEL").arg(first).cmd("DEL").arg(second);

        with_deadline(deadline, async {
            let _: () = pipe.query_async(&mut conn).await?;
            Ok::<(), CacheError>(())
        })
        .await
    }
}

// == Redis Connector ==
/// Opens Redis connections from a [`StoreConfig`].
#[derive(Debug, Clone)]
pub struct RedisConnector {
    config: StoreConfig,
}

impl RedisConnector {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for RedisConnector {
    async fn connect(&self) -> Result<Arc<dyn KvStore>> {
        let connection_error = |err: redis::RedisError| CacheError::Connection(err.to_string());

        let mut info = (self.config.host.as_str(), self.config.port)
            .into_connection_info()
            .map_err(connection_error)?;
        info.redis.db = self.config.db;
        info.redis.password = self.config.password.clone();

        let client = redis::Client::open(info).map_err(connection_error)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connection_error)?;

        debug!(addr = %self.target(), db = self.config.db, "redis connection opened");
        Ok(Arc::new(RedisStore::new(conn)))
    }

    fn target(&self) -> String {
        format!("redis://{}:{}", self.config.host, self.config.port)
    }
}
