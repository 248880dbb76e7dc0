use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::cache::FreshnessPolicy;
use crate::domain::Platform;

pub const CONFIG_PATH_ENV: &str = "SHOPSCOUT_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub cache: CacheConfig,

    pub scrapers: ScraperConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/shopscout.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Expiry windows in hours. `0` keeps entries forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub search_expiry_hours: u32,

    pub deals_expiry_hours: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_expiry_hours: 24,
            deals_expiry_hours: 6,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn search_policy(&self) -> FreshnessPolicy {
        FreshnessPolicy::from_hours(self.search_expiry_hours)
    }

    #[must_use]
    pub fn deals_policy(&self) -> FreshnessPolicy {
        FreshnessPolicy::from_hours(self.deals_expiry_hours)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Base URL of the scraping service.
    pub service_url: String,

    /// Per-platform search timeout in seconds (default: 45)
    pub timeout_seconds: u64,

    /// Deals feed timeout in seconds (default: 60)
    pub deals_timeout_seconds: u64,

    pub max_results: usize,

    pub platforms: Vec<Platform>,

    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8000".to_string(),
            timeout_seconds: 45,
            deals_timeout_seconds: 60,
            max_results: 8,
            platforms: Platform::ALL.to_vec(),
            user_agent: format!("shopscout/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ScraperConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[must_use]
    pub const fn deals_timeout(&self) -> Duration {
        Duration::from_secs(self.deals_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "shopscout".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            info!("Loading config from {CONFIG_PATH_ENV}: {}", path.display());
            return Self::load_from_path(&path);
        }

        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("shopscout").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".shopscout").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV).map_or_else(|_| PathBuf::from("config.toml"), PathBuf::from)
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scrapers.service_url.trim().is_empty() {
            anyhow::bail!("Scraper service URL cannot be empty");
        }

        url::Url::parse(&self.scrapers.service_url).with_context(|| {
            format!("Invalid scraper service URL: {}", self.scrapers.service_url)
        })?;

        if self.scrapers.timeout_seconds == 0 || self.scrapers.deals_timeout_seconds == 0 {
            anyhow::bail!("Scraper timeouts must be > 0");
        }

        if self.scrapers.platforms.is_empty() {
            anyhow::bail!("At least one platform must be enabled");
        }

        Ok(())
    }
}
