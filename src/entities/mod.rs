pub mod prelude;

pub mod deals_snapshot;
pub mod search_cache;
