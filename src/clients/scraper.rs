use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use super::payload::parse_listings;
use super::{AdapterError, ScrapeAdapter};
use crate::domain::{Listing, Platform};

/// Builds `{service_url}/{segments..}`, keeping any path prefix on the base.
pub(crate) fn service_endpoint(service_url: &Url, segments: &[&str]) -> Result<Url, AdapterError> {
    let mut url = service_url.clone();
    url.path_segments_mut()
        .map_err(|()| AdapterError::Failed(format!("invalid scraper service URL: {service_url}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Sends a GET and decodes the body as a scrape payload for `platform`.
pub(crate) async fn fetch_listings(
    client: &Client,
    url: Url,
    platform: Platform,
    timeout: Duration,
) -> Result<Vec<Listing>, AdapterError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| AdapterError::from_reqwest(&e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AdapterError::Failed(format!("scraper service returned HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| AdapterError::from_reqwest(&e, timeout))?;

    parse_listings(&body, platform)
        .map_err(|e| AdapterError::Failed(format!("unreadable scraper response: {e}")))
}

/// Queries one platform through the external scraping service.
pub struct HttpScrapeAdapter {
    client: Client,
    service_url: Url,
    platform: Platform,
    max_results: usize,
}

impl HttpScrapeAdapter {
    #[must_use]
    pub const fn new(client: Client, service_url: Url, platform: Platform, max_results: usize) -> Self {
        Self {
            client,
            service_url,
            platform,
            max_results,
        }
    }

    fn search_url(&self, query: &str) -> Result<Url, AdapterError> {
        let mut url = service_endpoint(&self.service_url, &["scrape", self.platform.slug()])?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("max_results", &self.max_results.to_string());
        Ok(url)
    }
}

#[async_trait::async_trait]
impl ScrapeAdapter for HttpScrapeAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(&self, query: &str, timeout: Duration) -> Result<Vec<Listing>, AdapterError> {
        let url = self.search_url(query)?;
        let started = Instant::now();
        debug!(platform = %self.platform, %url, "Querying scraper service");

        let result = fetch_listings(&self.client, url, self.platform, timeout).await;
        match &result {
            Ok(listings) => debug!(
                platform = %self.platform,
                count = listings.len(),
                elapsed_ms = started.elapsed().as_millis(),
                "Scrape finished"
            ),
            Err(e) => warn!(platform = %self.platform, error = %e, "Scrape failed"),
        }

        let mut listings = result?;
        listings.truncate(self.max_results);
        Ok(listings)
    }
}
