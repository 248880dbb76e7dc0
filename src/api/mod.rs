use axum::{
    Router,
    http::{HeaderValue, Uri},
    middleware,
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::ResultStore;
use crate::services::{AggregationEngine, DealsCache};
use crate::state::SharedState;

mod deals;
mod error;
mod observability;
mod results;
mod search;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn engine(&self) -> &AggregationEngine {
        &self.shared.engine
    }

    #[must_use]
    pub fn deals(&self) -> &DealsCache {
        &self.shared.deals
    }

    #[must_use]
    pub fn results(&self) -> &dyn ResultStore {
        self.shared.results.as_ref()
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/search", get(search::search).post(search::search_json))
        .route("/search/{platform}", get(search::search_platform))
        .route("/amazon/deals", get(deals::get_amazon_deals))
        .route("/api/results", get(results::list_results))
        .route("/history", get(results::history))
        .route("/cached/{cache_key}", get(results::get_cached))
        .route("/status", get(system::get_status))
        .route("/test", get(system::test_connection))
        .route("/health", get(system::health))
        .route("/metrics", get(observability::get_metrics))
        .fallback(not_found)
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found("Endpoint", uri.path())
}
