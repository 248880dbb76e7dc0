pub use super::deals_snapshot::Entity as DealsSnapshot;
pub use super::search_cache::Entity as SearchCache;
