//! Query Routes
//!
//! - POST /api/v1/query - Execute a batch of queries
//!
//! The batch always answers 200; each query carries its own frames or error.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{QueryBatchRequest, QueryBatchResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// POST /api/v1/query
pub async fn execute_queries(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryBatchRequest>,
) -> ApiResult<Json<QueryBatchResponse>> {
    if req.queries.is_empty() {
        return Err(ApiError::Validation("queries cannot be empty".to_string()));
    }

    let count = req.queries.len();
    let results = state.executor.execute_batch(req.queries).await;

    let failed = results.values().filter(|r| r.is_error()).count();
    tracing::debug!(queries = count, failed, "Batch completed");

    Ok(Json(QueryBatchResponse { results }))
}
