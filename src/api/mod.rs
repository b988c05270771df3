//! API Module
//!
//! HTTP handlers and routing for the cache service REST API.
//!
//! # Endpoints
//! - `PUT /objects/*key` - Store a JSON object
//! - `GET /objects/*key` - Read an object and its status
//! - `POST /check/*key` - Mark an object as consumed
//! - `DELETE /objects/*key` - Delete an object and its status
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint (pings the store)

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
