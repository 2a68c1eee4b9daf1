//! Pipe Routes
//!
//! - GET /api/v1/pipes - List pipes exposed as endpoints

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::PipeListResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/v1/pipes
pub async fn list_pipes(State(state): State<Arc<AppState>>) -> ApiResult<Json<PipeListResponse>> {
    let pipes = state.executor.source().list_pipes().await?;
    Ok(Json(PipeListResponse { pipes }))
}
