//! Domain types for cross-platform product search.
//!
//! Everything here is a plain value: listings are immutable observations,
//! aggregated results are built once and then shared behind an `Arc`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A storefront the aggregator knows how to query.
///
/// Declaration order is the order groups are reported in.
///
/// # Examples
///
/// ```rust
/// use shopscout::domain::Platform;
///
/// let platform: Platform = "Flipkart".parse().unwrap();
/// assert_eq!(platform, Platform::Flipkart);
/// assert_eq!(platform.slug(), "flipkart");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Amazon,
    Flipkart,
    Meesho,
    Myntra,
}

impl Platform {
    pub const ALL: [Self; 4] = [Self::Amazon, Self::Flipkart, Self::Meesho, Self::Myntra];

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Amazon => "amazon",
            Self::Flipkart => "flipkart",
            Self::Meesho => "meesho",
            Self::Myntra => "myntra",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Amazon => "Amazon",
            Self::Flipkart => "Flipkart",
            Self::Meesho => "Meesho",
            Self::Myntra => "Myntra",
        }
    }

    /// Storefront origin used to resolve relative product links.
    #[must_use]
    pub const fn site_url(self) -> &'static str {
        match self {
            Self::Amazon => "https://www.amazon.in",
            Self::Flipkart => "https://www.flipkart.com",
            Self::Meesho => "https://www.meesho.com",
            Self::Myntra => "https://www.myntra.com",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown platform '{0}'. Available platforms: amazon, flipkart, meesho, myntra")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.slug().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownPlatform(s.to_string()))
    }
}

/// Which platforms a search fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlatformFilter {
    #[default]
    All,
    Only(Platform),
}

impl PlatformFilter {
    /// Parses an optional query-string value; missing, empty and `all` select every platform.
    pub fn parse(raw: Option<&str>) -> Result<Self, UnknownPlatform> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::All),
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(Self::All),
            Some(s) => s.parse().map(Self::Only),
        }
    }

    #[must_use]
    pub fn includes(self, platform: Platform) -> bool {
        match self {
            Self::All => true,
            Self::Only(p) => p == platform,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Only(p) => p.slug(),
        }
    }
}

impl fmt::Display for PlatformFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PlatformFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PlatformFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(Some(&raw)).map_err(serde::de::Error::custom)
    }
}

/// One product observation from one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub price: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
    pub platform: Platform,
}

/// Listings a single platform contributed to an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformGroup {
    pub platform: Platform,
    pub listings: Vec<Listing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlatformGroup {
    #[must_use]
    pub const fn succeeded(platform: Platform, listings: Vec<Listing>) -> Self {
        Self {
            platform,
            listings,
            error: None,
        }
    }

    pub fn failed(platform: Platform, error: impl fmt::Display) -> Self {
        Self {
            platform,
            listings: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    #[must_use]
    pub fn has_listings(&self) -> bool {
        self.error.is_none() && !self.listings.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Cache,
    Live,
}

impl ResultSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Live => "live",
        }
    }
}

/// Merged listings across platforms for one normalized query.
///
/// `success` is derived from the groups and never set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub query: String,
    pub filter: PlatformFilter,
    pub groups: Vec<PlatformGroup>,
    pub success: bool,
    pub source: ResultSource,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
}

impl AggregatedResult {
    /// Builds a freshly fetched result; groups are put in platform order.
    #[must_use]
    pub fn live(
        query: impl Into<String>,
        filter: PlatformFilter,
        mut groups: Vec<PlatformGroup>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        groups.sort_by_key(|g| g.platform);
        let success = groups.iter().any(PlatformGroup::has_listings);
        Self {
            query: query.into(),
            filter,
            groups,
            success,
            source: ResultSource::Live,
            fetched_at,
            cached_at: None,
        }
    }

    /// Re-labels a stored result as served from cache.
    #[must_use]
    pub fn into_cached(mut self, stored_at: DateTime<Utc>) -> Self {
        self.source = ResultSource::Cache;
        self.cached_at = Some(stored_at);
        self
    }

    #[must_use]
    pub fn total_results(&self) -> usize {
        self.groups.iter().map(|g| g.listings.len()).sum()
    }

    #[must_use]
    pub fn failed_platforms(&self) -> Vec<Platform> {
        self.groups
            .iter()
            .filter(|g| g.error.is_some())
            .map(|g| g.platform)
            .collect()
    }

    #[must_use]
    pub fn message(&self) -> String {
        match (self.source, self.success) {
            (_, false) => "No products found on any platform".to_string(),
            (ResultSource::Cache, true) => "Results retrieved from cache".to_string(),
            (ResultSource::Live, true) => {
                let ok = self.groups.iter().filter(|g| g.has_listings()).count();
                format!("Fetched live results from {ok} of {} platforms", self.groups.len())
            }
        }
    }
}

/// The single homepage deals row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealsSnapshot {
    pub listings: Vec<Listing>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(platform: Platform) -> Listing {
        Listing {
            title: "Cotton socks".to_string(),
            price: "₹199".to_string(),
            link: format!("{}/p/1", platform.site_url()),
            image: None,
            discount: None,
            platform,
        }
    }

    #[test]
    fn platform_parses_case_insensitively() {
        assert_eq!("AMAZON".parse::<Platform>(), Ok(Platform::Amazon));
        assert_eq!(" myntra ".parse::<Platform>(), Ok(Platform::Myntra));
        assert!("ebay".parse::<Platform>().is_err());
    }

    #[test]
    fn filter_parse_defaults_to_all() {
        assert_eq!(PlatformFilter::parse(None), Ok(PlatformFilter::All));
        assert_eq!(PlatformFilter::parse(Some("")), Ok(PlatformFilter::All));
        assert_eq!(PlatformFilter::parse(Some("All")), Ok(PlatformFilter::All));
        assert_eq!(
            PlatformFilter::parse(Some("meesho")),
            Ok(PlatformFilter::Only(Platform::Meesho))
        );
        assert!(PlatformFilter::parse(Some("ebay")).is_err());
    }

    #[test]
    fn filter_includes() {
        assert!(PlatformFilter::All.includes(Platform::Flipkart));
        assert!(PlatformFilter::Only(Platform::Amazon).includes(Platform::Amazon));
        assert!(!PlatformFilter::Only(Platform::Amazon).includes(Platform::Myntra));
    }

    #[test]
    fn filter_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlatformFilter::Only(Platform::Flipkart)).unwrap();
        assert_eq!(json, "\"flipkart\"");
        let back: PlatformFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PlatformFilter::Only(Platform::Flipkart));
        let all: PlatformFilter = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(all, PlatformFilter::All);
    }

    #[test]
    fn success_requires_a_non_empty_group() {
        let now = Utc::now();
        let result = AggregatedResult::live(
            "socks",
            PlatformFilter::All,
            vec![
                PlatformGroup::failed(Platform::Amazon, "timed out"),
                PlatformGroup::succeeded(Platform::Flipkart, vec![]),
            ],
            now,
        );
        assert!(!result.success);
        assert_eq!(result.message(), "No products found on any platform");

        let result = AggregatedResult::live(
            "socks",
            PlatformFilter::All,
            vec![PlatformGroup::succeeded(
                Platform::Meesho,
                vec![listing(Platform::Meesho)],
            )],
            now,
        );
        assert!(result.success);
        assert_eq!(result.total_results(), 1);
    }

    #[test]
    fn live_orders_groups_by_platform() {
        let result = AggregatedResult::live(
            "socks",
            PlatformFilter::All,
            vec![
                PlatformGroup::failed(Platform::Myntra, "boom"),
                PlatformGroup::succeeded(Platform::Amazon, vec![listing(Platform::Amazon)]),
            ],
            Utc::now(),
        );
        let order: Vec<_> = result.groups.iter().map(|g| g.platform).collect();
        assert_eq!(order, vec![Platform::Amazon, Platform::Myntra]);
        assert_eq!(result.failed_platforms(), vec![Platform::Myntra]);
    }

    #[test]
    fn into_cached_keeps_fetch_time() {
        let fetched = Utc::now();
        let stored = fetched + chrono::Duration::seconds(1);
        let result = AggregatedResult::live("socks", PlatformFilter::All, vec![], fetched)
            .into_cached(stored);
        assert_eq!(result.source, ResultSource::Cache);
        assert_eq!(result.fetched_at, fetched);
        assert_eq!(result.cached_at, Some(stored));
    }
}
