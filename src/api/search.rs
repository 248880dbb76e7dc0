use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::validation::{parse_filter, parse_flag, parse_platform};
use super::{ApiError, AppState, SearchBody, SearchParams, SearchResponse};
use crate::domain::PlatformFilter;

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let filter = parse_filter(params.platform.as_deref())?;
    let query = params.query.unwrap_or_default();
    let force_refresh = parse_flag(params.force_refresh.as_deref());

    run_search(&state, &query, filter, force_refresh).await
}

pub async fn search_json(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, ApiError> {
    let filter = parse_filter(body.platform.as_deref())?;
    run_search(&state, &body.query, filter, body.force_refresh).await
}

pub async fn search_platform(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let platform = parse_platform(&platform)?;
    let query = params.query.unwrap_or_default();
    let force_refresh = parse_flag(params.force_refresh.as_deref());

    run_search(&state, &query, PlatformFilter::Only(platform), force_refresh).await
}

async fn run_search(
    state: &AppState,
    query: &str,
    filter: PlatformFilter,
    force_refresh: bool,
) -> Result<Json<SearchResponse>, ApiError> {
    let started = Instant::now();
    info!(query, %filter, force_refresh, "Search request");

    let result = state.engine().search(query, filter, force_refresh).await?;

    Ok(Json(SearchResponse::from_result(&result, started.elapsed())))
}
