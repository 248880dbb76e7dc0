//! Cache keys, query normalization and the freshness evaluator shared by
//! search results and the deals snapshot.

pub mod single_flight;

pub use single_flight::{CancelSignal, FlightError, SingleFlight};

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use thiserror::Error;

use crate::domain::PlatformFilter;

pub const MAX_QUERY_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidQuery {
    #[error("Search query cannot be empty")]
    Empty,

    #[error("Search query must be {MAX_QUERY_CHARS} characters or less")]
    TooLong,

    #[error("Search query contains control characters")]
    ControlCharacters,
}

/// A search term after normalization, paired with its platform filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    term: String,
    filter: PlatformFilter,
}

impl SearchQuery {
    /// Trims, collapses internal whitespace and case-folds `raw`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shopscout::cache::SearchQuery;
    /// use shopscout::domain::PlatformFilter;
    ///
    /// let q = SearchQuery::new("  Running   SHOES ", PlatformFilter::All).unwrap();
    /// assert_eq!(q.term(), "running shoes");
    /// ```
    pub fn new(raw: &str, filter: PlatformFilter) -> Result<Self, InvalidQuery> {
        if raw.chars().any(|c| c.is_control() && !c.is_whitespace()) {
            return Err(InvalidQuery::ControlCharacters);
        }

        let term = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if term.is_empty() {
            return Err(InvalidQuery::Empty);
        }
        if term.chars().count() > MAX_QUERY_CHARS {
            return Err(InvalidQuery::TooLong);
        }

        Ok(Self { term, filter })
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub const fn filter(&self) -> PlatformFilter {
        self.filter
    }

    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey(format!("{}:{}", self.filter.as_str(), self.term))
    }
}

/// Store key for one `(term, filter)` pair, rendered as `filter:term`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps a key read back from the store.
    #[must_use]
    pub const fn from_stored(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How long a stored value stays servable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessPolicy {
    Forever,
    Within(Duration),
}

impl FreshnessPolicy {
    /// Builds a policy from configured hours; `0` means entries never expire.
    #[must_use]
    pub fn from_hours(hours: u32) -> Self {
        if hours == 0 {
            Self::Forever
        } else {
            Self::Within(Duration::hours(i64::from(hours)))
        }
    }

    /// An entry is fresh while its age is strictly below the window.
    /// Timestamps ahead of `now` count as fresh.
    #[must_use]
    pub fn is_fresh(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::Forever => true,
            Self::Within(window) => now.signed_duration_since(stored_at) < *window,
        }
    }

    /// When a value stored at `stored_at` stops being fresh, if ever.
    #[must_use]
    pub fn expires_at(&self, stored_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Forever => None,
            Self::Within(window) => stored_at.checked_add_signed(*window),
        }
    }

    /// Whole hours for status reporting; `0` for never.
    #[must_use]
    pub fn hours(&self) -> i64 {
        match self {
            Self::Forever => 0,
            Self::Within(window) => window.num_hours(),
        }
    }
}
