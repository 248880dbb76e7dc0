use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::scraper::{fetch_listings, service_endpoint};
use super::{AdapterError, DealsAdapter};
use crate::domain::{Listing, Platform};

/// Pulls the Amazon homepage deals feed from the scraping service.
pub struct HttpDealsAdapter {
    client: Client,
    service_url: Url,
}

impl HttpDealsAdapter {
    #[must_use]
    pub const fn new(client: Client, service_url: Url) -> Self {
        Self {
            client,
            service_url,
        }
    }
}

#[async_trait::async_trait]
impl DealsAdapter for HttpDealsAdapter {
    async fn fetch_deals(&self, timeout: Duration) -> Result<Vec<Listing>, AdapterError> {
        let url = service_endpoint(&self.service_url, &["scrape", "amazon", "deals"])?;
        debug!(%url, "Fetching homepage deals");

        match fetch_listings(&self.client, url, Platform::Amazon, timeout).await {
            Ok(deals) => {
                debug!(count = deals.len(), "Deals fetched");
                Ok(deals)
            }
            Err(e) => {
                warn!(error = %e, "Deals fetch failed");
                Err(e)
            }
        }
    }
}
