//! API Handlers
//!
//! HTTP request handlers for each cache service endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::cache::ObjectCache;
use crate::error::Result;
use crate::models::{
    CheckResponse, DeleteResponse, HealthResponse, ObjectResponse, SetResponse, StatsResponse,
};
use crate::status::Status;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ObjectCache>,
}

impl AppState {
    /// Creates a new AppState around the given cache.
    pub fn new(cache: ObjectCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }
}

/// Handler for PUT /objects/*key
///
/// Stores the request body under the key and reports the resulting status.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> Result<Json<SetResponse>> {
    let status = state.cache.set_object(&key, &value).await?;
    Ok(Json(SetResponse::new(key, status)))
}

/// Handler for GET /objects/*key
///
/// A miss answers 404 with status `empty`.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<(StatusCode, Json<ObjectResponse>)> {
    let (status, value) = state.cache.get_object::<Value>(&key).await?;
    let code = if status == Status::Empty {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    Ok((code, Json(ObjectResponse::new(key, status, value))))
}

/// Handler for POST /check/*key
pub async fn check_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CheckResponse>> {
    state.cache.check_object(&key).await?;
    Ok(Json(CheckResponse::new(key)))
}

/// Handler for DELETE /objects/*key
///
/// Deleting a missing key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.cache.del_object(&key).await?;
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let counters = state.cache.stats().await;
    Json(StatsResponse::new(
        counters,
        state.cache.connections().connects(),
    ))
}

/// Handler for GET /health
///
/// Answers 503 when the store cannot be pinged.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let response = match state.cache.ping().await {
        Ok(()) => HealthResponse::healthy(),
        Err(err) => HealthResponse::unhealthy(err.to_string()),
    };
    let code = if response.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}
