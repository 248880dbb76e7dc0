//! Cache-aside search across every configured platform.

use chrono::Utc;
use metrics::{counter, histogram};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CancelSignal, FreshnessPolicy, InvalidQuery, SearchQuery, SingleFlight};
use crate::clients::{AdapterError, ScrapeAdapter};
use crate::db::{CacheEntry, ResultStore};
use crate::domain::{AggregatedResult, Platform, PlatformFilter, PlatformGroup};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error(transparent)]
    InvalidQuery(#[from] InvalidQuery),

    #[error("Search aborted: {0}")]
    Aborted(String),
}

struct EngineInner {
    adapters: Vec<Arc<dyn ScrapeAdapter>>,
    store: Arc<dyn ResultStore>,
    freshness: FreshnessPolicy,
    adapter_timeout: Duration,
}

/// Serves searches from the result store when fresh and otherwise fans out
/// to the scrapers, with at most one aggregation per cache key in flight.
pub struct AggregationEngine {
    inner: Arc<EngineInner>,
    flights: SingleFlight<CacheKey, Arc<AggregatedResult>>,
}

impl AggregationEngine {
    #[must_use]
    pub fn new(
        mut adapters: Vec<Arc<dyn ScrapeAdapter>>,
        store: Arc<dyn ResultStore>,
        freshness: FreshnessPolicy,
        adapter_timeout: Duration,
    ) -> Self {
        adapters.sort_by_key(|a| a.platform());
        adapters.dedup_by_key(|a| a.platform());

        Self {
            inner: Arc::new(EngineInner {
                adapters,
                store,
                freshness,
                adapter_timeout,
            }),
            flights: SingleFlight::new(),
        }
    }

    /// Platforms with an adapter, in report order.
    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        self.inner.adapters.iter().map(|a| a.platform()).collect()
    }

    #[must_use]
    pub fn freshness(&self) -> FreshnessPolicy {
        self.inner.freshness
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.flights.in_flight()
    }

    /// Looks up, fetches and stores inside a single flight per cache key.
    /// A forced refresh skips the lookup but still joins a running flight.
    pub async fn search(
        &self,
        raw_query: &str,
        filter: PlatformFilter,
        force_refresh: bool,
    ) -> Result<Arc<AggregatedResult>, SearchError> {
        let query = SearchQuery::new(raw_query, filter)?;
        let key = query.cache_key();

        let inner = Arc::clone(&self.inner);
        let (result, leader) = self
            .flights
            .run(key.clone(), move |cancel| inner.execute(query, force_refresh, cancel))
            .await
            .map_err(|e| SearchError::Aborted(e.to_string()))?;

        if !leader {
            counter!("search_flight_joins_total").increment(1);
            debug!(cache_key = %key, "Joined in-flight search");
        }

        Ok(result)
    }
}

impl EngineInner {
    async fn execute(
        self: Arc<Self>,
        query: SearchQuery,
        force_refresh: bool,
        cancel: CancelSignal,
    ) -> Arc<AggregatedResult> {
        let key = query.cache_key();

        if force_refresh {
            debug!(cache_key = %key, "Forced refresh, skipping cache lookup");
        } else {
            match self.store.get(&key).await {
                Ok(Some(entry)) if self.freshness.is_fresh(entry.stored_at, Utc::now()) => {
                    counter!("search_cache_hits_total").increment(1);
                    debug!(cache_key = %key, stored_at = %entry.stored_at, "Serving cached result");
                    return Arc::new(entry.result.into_cached(entry.stored_at));
                }
                Ok(Some(entry)) => {
                    debug!(cache_key = %key, stored_at = %entry.stored_at, "Cached result is stale");
                }
                Ok(None) => {}
                Err(e) => {
                    counter!("search_store_errors_total", "op" => "read").increment(1);
                    warn!(cache_key = %key, error = %e, "Cache lookup failed, fetching live");
                }
            }
            counter!("search_cache_misses_total").increment(1);
        }

        let started = Instant::now();
        let groups = self.fan_out(query.term(), query.filter(), cancel).await;
        let result = AggregatedResult::live(query.term(), query.filter(), groups, Utc::now());

        info!(
            query = %result.query,
            filter = %result.filter,
            total = result.total_results(),
            failed = result.failed_platforms().len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Live search finished"
        );

        if result.success {
            self.write_back(key, &result).await;
        } else {
            debug!(cache_key = %key, "No listings found, not caching");
        }

        Arc::new(result)
    }

    async fn fan_out(
        &self,
        term: &str,
        filter: PlatformFilter,
        mut cancel: CancelSignal,
    ) -> Vec<PlatformGroup> {
        let mut groups = Vec::new();
        let mut pending = BTreeSet::new();
        let mut tasks = JoinSet::new();

        for adapter in self.adapters.iter().filter(|a| filter.includes(a.platform())) {
            let adapter = Arc::clone(adapter);
            let term = term.to_string();
            let timeout = self.adapter_timeout;
            pending.insert(adapter.platform());

            tasks.spawn(async move {
                let platform = adapter.platform();
                let started = Instant::now();
                let outcome = tokio::time::timeout(timeout, adapter.fetch(&term, timeout))
                    .await
                    .unwrap_or(Err(AdapterError::Timeout(timeout)));
                histogram!("adapter_fetch_duration_seconds", "platform" => platform.slug())
                    .record(started.elapsed().as_secs_f64());
                (platform, outcome)
            });
        }

        if let PlatformFilter::Only(platform) = filter
            && !pending.contains(&platform)
        {
            groups.push(PlatformGroup::failed(platform, "scraper not enabled"));
        }

        let mut cancelled = false;
        loop {
            tokio::select! {
                joined = tasks.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok((platform, Ok(listings))) => {
                            pending.remove(&platform);
                            groups.push(PlatformGroup::succeeded(platform, listings));
                        }
                        Ok((platform, Err(e))) => {
                            pending.remove(&platform);
                            counter!(
                                "adapter_failures_total",
                                "platform" => platform.slug(),
                                "kind" => e.kind()
                            )
                            .increment(1);
                            groups.push(PlatformGroup::failed(platform, e));
                        }
                        Err(e) => warn!(error = %e, "Adapter task did not complete"),
                    }
                }
                () = cancel.cancelled() => {
                    cancelled = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        let leftover = if cancelled {
            info!(term, unreported = pending.len(), "Search cancelled by all callers");
            AdapterError::Cancelled.to_string()
        } else {
            "adapter task aborted".to_string()
        };
        groups.extend(
            pending
                .into_iter()
                .map(|platform| PlatformGroup::failed(platform, &leftover)),
        );

        groups
    }

    async fn write_back(&self, key: CacheKey, result: &AggregatedResult) {
        let entry = CacheEntry {
            key,
            result: result.clone(),
            stored_at: Utc::now(),
        };

        if let Err(e) = self.store.upsert(&entry).await {
            counter!("search_store_errors_total", "op" => "write").increment(1);
            warn!(cache_key = %entry.key, error = %e, "Failed to cache search result");
        }
    }
}
