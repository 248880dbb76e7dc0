use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::db::CacheEntry;
use crate::domain::{AggregatedResult, Listing, Platform, PlatformFilter, PlatformGroup, ResultSource};
use crate::services::DealsView;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(alias = "q")]
    pub query: Option<String>,
    pub platform: Option<String>,
    pub force_refresh: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(alias = "q")]
    pub query: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Serialize)]
pub struct PlatformGroupDto {
    pub site: String,
    pub total_products: usize,
    pub products: Vec<Listing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&PlatformGroup> for PlatformGroupDto {
    fn from(group: &PlatformGroup) -> Self {
        Self {
            site: group.platform.display_name().to_string(),
            total_products: group.listings.len(),
            products: group.listings.clone(),
            error: group.error.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    pub platform: PlatformFilter,
    pub source: ResultSource,
    pub total_results: usize,
    pub message: String,
    pub results: Vec<PlatformGroupDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub processing_time: String,
}

impl SearchResponse {
    #[must_use]
    pub fn from_result(result: &AggregatedResult, elapsed: Duration) -> Self {
        Self {
            success: result.success,
            query: result.query.clone(),
            platform: result.filter,
            source: result.source,
            total_results: result.total_results(),
            message: result.message(),
            results: result.groups.iter().map(PlatformGroupDto::from).collect(),
            cached_at: result.cached_at,
            fetched_at: result.fetched_at,
            processing_time: format!("{:.2}s", elapsed.as_secs_f64()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DealsResponse {
    pub total_deals: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub source: ResultSource,
    pub stale: bool,
    pub deals: Vec<Listing>,
}

impl From<DealsView> for DealsResponse {
    fn from(view: DealsView) -> Self {
        Self {
            total_deals: view.snapshot.listings.len(),
            timestamp: view.snapshot.fetched_at,
            expires_at: view.snapshot.expires_at,
            source: view.source,
            stale: view.stale,
            deals: view.snapshot.listings.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultsParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct StoredResultDto {
    pub cache_key: String,
    pub query: String,
    pub platform: PlatformFilter,
    pub success: bool,
    pub total_results: usize,
    pub stored_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub results: Vec<PlatformGroupDto>,
}

impl From<&CacheEntry> for StoredResultDto {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            cache_key: entry.key.to_string(),
            query: entry.result.query.clone(),
            platform: entry.result.filter,
            success: entry.result.success,
            total_results: entry.result.total_results(),
            stored_at: entry.stored_at,
            fetched_at: entry.result.fetched_at,
            results: entry.result.groups.iter().map(PlatformGroupDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub count: usize,
    pub results: Vec<StoredResultDto>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub api_status: &'static str,
    #[serde(rename = "mongodb_status")]
    pub store_status: &'static str,
    pub cache_expiry_hours: i64,
    pub deals_expiry_hours: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_queries: Option<u64>,
    pub in_flight_searches: usize,
    pub uptime_seconds: u64,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "mongodb_connected")]
    pub store_connected: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub available_scrapers: Vec<Platform>,
}
