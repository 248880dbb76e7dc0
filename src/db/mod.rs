use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::cache::CacheKey;
use crate::domain::{AggregatedResult, DealsSnapshot};

pub mod migrator;
pub mod repositories;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt stored record: {0}")]
    Corrupt(String),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// One stored aggregation. At most one exists per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub result: AggregatedResult,
    pub stored_at: DateTime<Utc>,
}

/// Keyed storage for aggregated search results.
#[async_trait::async_trait]
pub trait ResultStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError>;

    /// Inserts or replaces the entry for `entry.key`.
    async fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError>;

    /// Most recently stored entries first.
    async fn list(&self, limit: u64) -> Result<Vec<CacheEntry>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Storage for the single homepage deals snapshot.
#[async_trait::async_trait]
pub trait DealsStore: Send + Sync {
    async fn load_deals(&self) -> Result<Option<DealsSnapshot>, StoreError>;

    async fn save_deals(&self, snapshot: &DealsSnapshot) -> Result<(), StoreError>;
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{raw}': {e}")))
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn cache_repo(&self) -> repositories::cache::SearchCacheRepository {
        repositories::cache::SearchCacheRepository::new(self.conn.clone())
    }

    fn deals_repo(&self) -> repositories::deals::DealsRepository {
        repositories::deals::DealsRepository::new(self.conn.clone())
    }
}

#[async_trait::async_trait]
impl ResultStore for Store {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        self.cache_repo().get(key).await
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.cache_repo().upsert(entry).await
    }

    async fn list(&self, limit: u64) -> Result<Vec<CacheEntry>, StoreError> {
        self.cache_repo().list(limit).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.cache_repo().count().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DealsStore for Store {
    async fn load_deals(&self) -> Result<Option<DealsSnapshot>, StoreError> {
        self.deals_repo().load().await
    }

    async fn save_deals(&self, snapshot: &DealsSnapshot) -> Result<(), StoreError> {
        self.deals_repo().save(snapshot).await
    }
}

/// Stand-in used when the database cannot be opened at startup. Every call
/// fails as unavailable, so searches run live and status reports disconnected.
#[derive(Debug, Clone)]
pub struct OfflineStore {
    reason: String,
}

impl OfflineStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn unavailable(&self) -> StoreError {
        StoreError::Unavailable(self.reason.clone())
    }
}

#[async_trait::async_trait]
impl ResultStore for OfflineStore {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        Err(self.unavailable())
    }

    async fn upsert(&self, _entry: &CacheEntry) -> Result<(), StoreError> {
        Err(self.unavailable())
    }

    async fn list(&self, _limit: u64) -> Result<Vec<CacheEntry>, StoreError> {
        Err(self.unavailable())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Err(self.unavailable())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(self.unavailable())
    }
}

#[async_trait::async_trait]
impl DealsStore for OfflineStore {
    async fn load_deals(&self) -> Result<Option<DealsSnapshot>, StoreError> {
        Err(self.unavailable())
    }

    async fn save_deals(&self, _snapshot: &DealsSnapshot) -> Result<(), StoreError> {
        Err(self.unavailable())
    }
}
