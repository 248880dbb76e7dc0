use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::clients::{
    DealsAdapter, HttpDealsAdapter, HttpScrapeAdapter, ScrapeAdapter, build_http_client,
};
use crate::config::Config;
use crate::db::{DealsStore, OfflineStore, ResultStore, Store};
use crate::services::{AggregationEngine, DealsCache};

/// Everything a request handler or CLI command needs, cheap to clone.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub results: Arc<dyn ResultStore>,

    pub engine: Arc<AggregationEngine>,

    pub deals: Arc<DealsCache>,
}

impl SharedState {
    /// Opens the database and wires the HTTP adapters from `config`.
    ///
    /// A database that cannot be opened is replaced by an [`OfflineStore`]:
    /// the service still starts, searches always run live and status
    /// endpoints report the store as disconnected.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (results, deals_store) = open_stores(&config).await;

        let http_client = build_http_client(&config.scrapers.user_agent)?;
        let service_url = Url::parse(&config.scrapers.service_url)?;

        let adapters: Vec<Arc<dyn ScrapeAdapter>> = config
            .scrapers
            .platforms
            .iter()
            .map(|&platform| {
                Arc::new(HttpScrapeAdapter::new(
                    http_client.clone(),
                    service_url.clone(),
                    platform,
                    config.scrapers.max_results,
                )) as Arc<dyn ScrapeAdapter>
            })
            .collect();

        let deals_adapter = Arc::new(HttpDealsAdapter::new(http_client, service_url));

        info!(
            service_url = %config.scrapers.service_url,
            platforms = adapters.len(),
            "Scraper adapters configured"
        );

        Ok(Self::with_components(
            config,
            adapters,
            deals_adapter,
            results,
            deals_store,
        ))
    }

    /// Assembles state from already-built parts.
    #[must_use]
    pub fn with_components(
        config: Config,
        adapters: Vec<Arc<dyn ScrapeAdapter>>,
        deals_adapter: Arc<dyn DealsAdapter>,
        results: Arc<dyn ResultStore>,
        deals_store: Arc<dyn DealsStore>,
    ) -> Self {
        let engine = Arc::new(AggregationEngine::new(
            adapters,
            Arc::clone(&results),
            config.cache.search_policy(),
            config.scrapers.timeout(),
        ));

        let deals = Arc::new(DealsCache::new(
            deals_adapter,
            deals_store,
            config.cache.deals_policy(),
            config.scrapers.deals_timeout(),
        ));

        Self {
            config: Arc::new(config),
            results,
            engine,
            deals,
        }
    }
}

async fn open_stores(config: &Config) -> (Arc<dyn ResultStore>, Arc<dyn DealsStore>) {
    match Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
    {
        Ok(store) => {
            let store = Arc::new(store);
            (
                Arc::clone(&store) as Arc<dyn ResultStore>,
                store as Arc<dyn DealsStore>,
            )
        }
        Err(e) => {
            warn!(error = %e, "Database unavailable, running without a result cache");
            let offline = Arc::new(OfflineStore::new(e.to_string()));
            (
                Arc::clone(&offline) as Arc<dyn ResultStore>,
                offline as Arc<dyn DealsStore>,
            )
        }
    }
}
