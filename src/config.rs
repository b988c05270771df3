//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CacheError;
use crate::store::Expiry;

/// Default lifetime of cached keys: six hours.
pub const DEFAULT_EXPIRE_TIME: u64 = 21600;

// == Backend ==
/// Which store the connection manager talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Redis,
    Memory,
}

impl FromStr for Backend {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Backend::Redis),
            "memory" => Ok(Backend::Memory),
            other => Err(CacheError::InvalidRequest(format!(
                "Unknown cache backend '{}'",
                other
            ))),
        }
    }
}

// == Store Config ==
/// Connection parameters for the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    /// `None` connects without AUTH
    pub password: Option<String>,
    pub db: i64,
    /// Lifetime in seconds applied to every written key; `0` disables expiry
    pub expire_time_secs: u64,
    /// Deadline for each individual store call
    pub op_timeout: Option<Duration>,
}

impl StoreConfig {
    /// Creates a config for the given server, using defaults elsewhere.
    pub fn new(host: impl Into<String>, port: u16, password: Option<String>, db: i64) -> Self {
        Self {
            host: host.into(),
            port,
            password,
            db,
            ..Self::default()
        }
    }

    /// Expiration applied when writing cache entries.
    pub fn expiry(&self) -> Expiry {
        Expiry::from_secs(self.expire_time_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            db: 0,
            expire_time_secs: DEFAULT_EXPIRE_TIME,
            op_timeout: None,
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store backend to use
    pub backend: Backend,
    /// Store connection parameters
    pub store: StoreConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Expired-key purge interval in seconds (memory backend only)
    pub cleanup_interval: u64,
}

fn parsed<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `REDIS_HOST` - Store host (default: 127.0.0.1)
    /// - `REDIS_PORT` - Store port (default: 6379)
    /// - `REDIS_PASSWORD` - Store password (default: none)
    /// - `REDIS_DB` - Database index (default: 0)
    /// - `EXPIRE_TIME` - Key lifetime in seconds, 0 = never (default: 21600)
    /// - `OP_TIMEOUT_MS` - Per-call deadline in milliseconds (default: none)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Purge frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = StoreConfig::default();

        Self {
            backend: parsed("CACHE_BACKEND").unwrap_or(Backend::Redis),
            store: StoreConfig {
                host: env::var("REDIS_HOST").unwrap_or(defaults.host),
                port: parsed("REDIS_PORT").unwrap_or(defaults.port),
                password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
                db: parsed("REDIS_DB").unwrap_or(defaults.db),
                expire_time_secs: parsed("EXPIRE_TIME").unwrap_or(defaults.expire_time_secs),
                op_timeout: parsed("OP_TIMEOUT_MS").map(Duration::from_millis),
            },
            server_port: parsed("SERVER_PORT").unwrap_or(3000),
            cleanup_interval: parsed("CLEANUP_INTERVAL").unwrap_or(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Redis,
            store: StoreConfig::default(),
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}
