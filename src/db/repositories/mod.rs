pub mod cache;
pub mod deals;
