//! Response models for the cache service API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing HTTP response bodies.

pub mod responses;

// Re-export commonly used types
pub use responses::{
    CheckResponse, DeleteResponse, HealthResponse, ObjectResponse, SetResponse, StatsResponse,
};
