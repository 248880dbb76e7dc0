use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::validation::{DEFAULT_RESULTS_LIMIT, clamp_history_limit, validate_limit};
use super::{ApiError, ApiResponse, AppState, ResultsParams, ResultsResponse, StoredResultDto};
use crate::cache::CacheKey;

pub async fn list_results(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResultsParams>,
) -> Result<Json<ApiResponse<ResultsResponse>>, ApiError> {
    let limit = validate_limit(params.limit.unwrap_or(DEFAULT_RESULTS_LIMIT))?;
    recent(&state, limit).await
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResultsParams>,
) -> Result<Json<ApiResponse<ResultsResponse>>, ApiError> {
    recent(&state, clamp_history_limit(params.limit)).await
}

/// Looks up one stored search by its `filter:term` key.
pub async fn get_cached(
    State(state): State<Arc<AppState>>,
    Path(cache_key): Path<String>,
) -> Result<Json<ApiResponse<StoredResultDto>>, ApiError> {
    let key = CacheKey::from_stored(cache_key);

    let entry = state
        .results()
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::not_found("Cached result", &key))?;

    Ok(Json(ApiResponse::success(StoredResultDto::from(&entry))))
}

async fn recent(
    state: &AppState,
    limit: usize,
) -> Result<Json<ApiResponse<ResultsResponse>>, ApiError> {
    let entries = state.results().list(limit as u64).await?;
    let results: Vec<StoredResultDto> = entries.iter().map(StoredResultDto::from).collect();

    Ok(Json(ApiResponse::success(ResultsResponse {
        count: results.len(),
        results,
    })))
}
