//! Status Cache - an object cache with per-key freshness tracking
//!
//! Stores JSON-encoded objects in a key-value store (Redis or in-process)
//! and keeps a companion `<key>/status` key recording whether the cached
//! value is unchecked, checked or dirty.

pub mod api;
pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod models;
pub mod status;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::ObjectCache;
pub use config::{Backend, Config, StoreConfig};
pub use connection::ConnectionManager;
pub use error::{CacheError, Result};
pub use status::{status_key, Status};
pub use tasks::spawn_cleanup_task;
