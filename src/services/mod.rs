pub mod aggregation;
pub use aggregation::{AggregationEngine, SearchError};

pub mod deals;
pub use deals::{DealsCache, DealsError, DealsView};
