//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::query::BatchResponse;
use crate::upstream::{HealthReport, PipeInfo};

// ============================================
// QUERY DTOs
// ============================================

/// Batch query request.
///
/// Queries stay raw JSON so one malformed query fails on its own instead of
/// rejecting the whole request.
#[derive(Debug, Deserialize)]
pub struct QueryBatchRequest {
    pub queries: Vec<serde_json::Value>,
}

/// Batch query response, keyed by refId
#[derive(Debug, Serialize)]
pub struct QueryBatchResponse {
    pub results: BatchResponse,
}

/// Template variable values
#[derive(Debug, Serialize, Deserialize)]
pub struct VariablesResponse {
    pub values: Vec<String>,
}

// ============================================
// PIPE DTOs
// ============================================

/// Pipes exposed as endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct PipeListResponse {
    pub pipes: Vec<PipeInfo>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    pub upstream: HealthReport,
    pub uptime_seconds: u64,
    pub version: String,
}
