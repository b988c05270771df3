//! Error types for the status cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::status::Status;

// == Cache Error Enum ==
/// Unified error type for the status cache.
///
/// A missing key is never an error: reads report [`Status::Empty`] instead.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The store could not be reached, refused the credentials or failed
    /// its liveness ping
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single get/set/del/exists call against an established handle failed,
    /// I/O errors included
    #[error("Store error: {0}")]
    Store(String),

    /// The object could not be encoded; nothing was written
    #[error("Serialization error for '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The stored bytes could not be decoded into the requested type.
    ///
    /// `status` is the status that was read before decoding failed.
    #[error("Deserialization error for '{key}' (status {status}): {source}")]
    Deserialization {
        key: String,
        status: Status,
        #[source]
        source: serde_json::Error,
    },

    /// The payload was written but the status key was not
    #[error("Partial write for '{key}': payload stored, status update failed: {source}")]
    PartialWrite {
        key: String,
        #[source]
        source: Box<CacheError>,
    },

    /// The payload was deleted but the status key was left behind
    #[error("Partial delete for '{key}': payload removed, status key orphaned: {source}")]
    PartialDelete {
        key: String,
        #[source]
        source: Box<CacheError>,
    },

    /// A store call exceeded the configured deadline
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Key rejected before reaching the store
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// Returns true for failures that left one half of a key pair applied.
    ///
    /// These need reconciliation rather than a blind retry.
    pub fn is_partial(&self) -> bool {
        matches!(
            self,
            CacheError::PartialWrite { .. } | CacheError::PartialDelete { .. }
        )
    }
}

/// Errors from individual commands. Connecting and pinging map their
/// failures to [`CacheError::Connection`] explicitly.
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Store(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Store(_) => StatusCode::BAD_GATEWAY,
            CacheError::Serialization { .. } => StatusCode::BAD_REQUEST,
            CacheError::Deserialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::PartialWrite { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::PartialDelete { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "partial": self.is_partial(),
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the status cache.
pub type Result<T> = std::result::Result<T, CacheError>;
