use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{FreshnessPolicy, SingleFlight};
use crate::clients::{AdapterError, DealsAdapter};
use crate::db::DealsStore;
use crate::domain::{DealsSnapshot, ResultSource};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DealsError {
    #[error("Deals unavailable: {0}")]
    Unavailable(String),
}

/// A deals snapshot as handed to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealsView {
    pub snapshot: Arc<DealsSnapshot>,
    pub source: ResultSource,
    /// Set when the snapshot is past its window and a refresh just failed.
    pub stale: bool,
}

struct DealsInner {
    adapter: Arc<dyn DealsAdapter>,
    store: Arc<dyn DealsStore>,
    freshness: FreshnessPolicy,
    timeout: Duration,
}

/// Homepage deals with their own expiry window and soft-stale fallback.
///
/// A refresh always runs to completion, so a caller that disconnects never
/// causes a second refresh for the next one.
pub struct DealsCache {
    inner: Arc<DealsInner>,
    flights: SingleFlight<(), Result<DealsView, DealsError>>,
}

impl DealsCache {
    #[must_use]
    pub fn new(
        adapter: Arc<dyn DealsAdapter>,
        store: Arc<dyn DealsStore>,
        freshness: FreshnessPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(DealsInner {
                adapter,
                store,
                freshness,
                timeout,
            }),
            flights: SingleFlight::detached(),
        }
    }

    #[must_use]
    pub fn freshness(&self) -> FreshnessPolicy {
        self.inner.freshness
    }

    pub async fn get_deals(&self) -> Result<DealsView, DealsError> {
        let inner = Arc::clone(&self.inner);
        let (outcome, _) = self
            .flights
            .run((), move |_| inner.load_or_refresh())
            .await
            .map_err(|e| DealsError::Unavailable(e.to_string()))?;
        outcome
    }
}

impl DealsInner {
    async fn load_or_refresh(self: Arc<Self>) -> Result<DealsView, DealsError> {
        let previous = match self.store.load_deals().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                counter!("deals_store_errors_total", "op" => "read").increment(1);
                warn!(error = %e, "Failed to load deals snapshot");
                None
            }
        };

        if let Some(snapshot) = &previous
            && self.freshness.is_fresh(snapshot.fetched_at, Utc::now())
        {
            counter!("deals_cache_hits_total").increment(1);
            debug!(fetched_at = %snapshot.fetched_at, "Serving cached deals");
            return Ok(DealsView {
                snapshot: Arc::new(snapshot.clone()),
                source: ResultSource::Cache,
                stale: false,
            });
        }

        match self.fetch().await {
            Ok(snapshot) => {
                if let Err(e) = self.store.save_deals(&snapshot).await {
                    counter!("deals_store_errors_total", "op" => "write").increment(1);
                    warn!(error = %e, "Failed to save deals snapshot");
                }
                info!(count = snapshot.listings.len(), "Deals refreshed");
                Ok(DealsView {
                    snapshot: Arc::new(snapshot),
                    source: ResultSource::Live,
                    stale: false,
                })
            }
            Err(e) => {
                counter!("deals_refresh_failures_total", "kind" => e.kind()).increment(1);
                match previous {
                    Some(snapshot) => {
                        warn!(
                            error = %e,
                            fetched_at = %snapshot.fetched_at,
                            "Deals refresh failed, serving stale snapshot"
                        );
                        Ok(DealsView {
                            snapshot: Arc::new(snapshot),
                            source: ResultSource::Cache,
                            stale: true,
                        })
                    }
                    None => {
                        warn!(error = %e, "Deals refresh failed with nothing cached");
                        Err(DealsError::Unavailable(e.to_string()))
                    }
                }
            }
        }
    }

    /// An empty feed counts as a failure so it never replaces a good snapshot.
    async fn fetch(&self) -> Result<DealsSnapshot, AdapterError> {
        let listings = tokio::time::timeout(self.timeout, self.adapter.fetch_deals(self.timeout))
            .await
            .unwrap_or(Err(AdapterError::Timeout(self.timeout)))?;

        if listings.is_empty() {
            return Err(AdapterError::Failed("no deals returned".to_string()));
        }

        let fetched_at = Utc::now();
        Ok(DealsSnapshot {
            listings,
            fetched_at,
            expires_at: self.freshness.expires_at(fetched_at),
        })
    }
}
