//! Adapters to the external scraping service.
//!
//! Each platform is reached through a [`ScrapeAdapter`]; the homepage deals
//! feed through a [`DealsAdapter`]. Both return listings already normalized
//! onto the fixed [`Listing`](crate::domain::Listing) shape.

pub mod deals;
pub mod payload;
pub mod scraper;

pub use deals::HttpDealsAdapter;
pub use scraper::HttpScrapeAdapter;

use crate::domain::{Listing, Platform};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("scrape failed: {0}")]
    Failed(String),

    #[error("cancelled before completion")]
    Cancelled,
}

impl AdapterError {
    /// Short label used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Failed(_) => "error",
            Self::Cancelled => "cancelled",
        }
    }

    fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Failed(err.to_string())
        }
    }
}

/// One platform's search backend.
///
/// Implementations must be safe to call concurrently and must give up once
/// `timeout` has elapsed.
#[async_trait::async_trait]
pub trait ScrapeAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch(&self, query: &str, timeout: Duration) -> Result<Vec<Listing>, AdapterError>;
}

/// Source of the homepage deals feed.
#[async_trait::async_trait]
pub trait DealsAdapter: Send + Sync {
    async fn fetch_deals(&self, timeout: Duration) -> Result<Vec<Listing>, AdapterError>;
}

/// Builds a shared HTTP client for talking to the scraping service.
pub fn build_http_client(user_agent: &str) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}
