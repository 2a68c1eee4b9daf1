//! Variable Routes
//!
//! - POST /api/v1/variables - Distinct values of a column for template variables

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::VariablesResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::query::PipeQuery;

/// POST /api/v1/variables
///
/// Body is a single query with `variableKey` set.
pub async fn variable_values(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<VariablesResponse>> {
    let query = PipeQuery::parse(body)?;
    let values = state.executor.variable_values(&query).await?;

    Ok(Json(VariablesResponse { values }))
}
