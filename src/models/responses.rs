//! Response DTOs for the cache service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;
use crate::status::Status;

/// Response body for reading an object (GET /objects/*key)
///
/// A miss carries `status: "empty"` and a null value.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectResponse {
    /// The requested key
    pub key: String,
    /// Freshness status of the object
    pub status: Status,
    /// The cached object, if any
    pub value: Option<Value>,
}

impl ObjectResponse {
    pub fn new(key: impl Into<String>, status: Status, value: Option<Value>) -> Self {
        Self {
            key: key.into(),
            status,
            value,
        }
    }
}

/// Response body for writing an object (PUT /objects/*key)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was written
    pub key: String,
    /// Status after the write; `dirty` means the previous write was never checked
    pub status: Status,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, status: Status) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' stored as {}", key, status),
            key,
            status,
        }
    }
}

/// Response body for checking an object (POST /check/*key)
#[derive(Debug, Clone, Serialize)]
pub struct CheckResponse {
    pub message: String,
    pub key: String,
}

impl CheckResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' checked", key),
            key,
        }
    }
}

/// Response body for deleting an object (DELETE /objects/*key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counters: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Store connections opened since startup
    pub connects: u64,
}

impl StatsResponse {
    pub fn new(counters: CacheStats, connects: u64) -> Self {
        Self {
            hit_rate: counters.hit_rate(),
            counters,
            connects,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    /// Store ping failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            error: Some(error.into()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}
