use super::ApiError;
use crate::domain::{Platform, PlatformFilter};

pub const DEFAULT_RESULTS_LIMIT: usize = 50;
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
const MAX_HISTORY_LIMIT: usize = 50;

pub fn validate_limit(limit: usize) -> Result<usize, ApiError> {
    const MAX_LIMIT: usize = 1000;
    const MIN_LIMIT: usize = 1;

    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {limit}. Limit must be between {MIN_LIMIT} and {MAX_LIMIT}"
        )));
    }
    Ok(limit)
}

/// `/history` is lenient: out-of-range limits are clamped, never rejected.
#[must_use]
pub fn clamp_history_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

pub fn parse_platform(raw: &str) -> Result<Platform, ApiError> {
    Ok(raw.parse()?)
}

pub fn parse_filter(raw: Option<&str>) -> Result<PlatformFilter, ApiError> {
    Ok(PlatformFilter::parse(raw)?)
}

/// Query-string booleans: `true`, `1` and `yes` in any case; everything else is false.
#[must_use]
pub fn parse_flag(raw: Option<&str>) -> bool {
    raw.map(str::trim).is_some_and(|v| {
        v.eq_ignore_ascii_case("true") || v == "1" || v.eq_ignore_ascii_case("yes")
    })
}
