use axum::{Json, extract::State};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::{AppState, HealthResponse, StatusResponse, TestResponse};

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let connected = store_connected(&state).await;
    let cached_queries = if connected {
        state.results().count().await.ok()
    } else {
        None
    };

    Json(StatusResponse {
        success: true,
        api_status: "online",
        store_status: if connected { "connected" } else { "disconnected" },
        cache_expiry_hours: state.engine().freshness().hours(),
        deals_expiry_hours: state.deals().freshness().hours(),
        cached_queries,
        in_flight_searches: state.engine().in_flight(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

pub async fn test_connection(State(state): State<Arc<AppState>>) -> Json<TestResponse> {
    let connected = store_connected(&state).await;
    let message = if connected {
        "API is working and the result store is connected"
    } else {
        "API is working but the result store is disconnected; searches run live"
    };

    Json(TestResponse {
        success: true,
        message: message.to_string(),
        timestamp: Utc::now(),
        store_connected: connected,
    })
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        available_scrapers: state.engine().platforms(),
    })
}

async fn store_connected(state: &AppState) -> bool {
    match state.results().ping().await {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "Store ping failed");
            false
        }
    }
}
