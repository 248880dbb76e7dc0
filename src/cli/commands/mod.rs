mod deals;
mod results;
mod search;
mod status;

pub use deals::cmd_deals;
pub use results::cmd_results;
pub use search::cmd_search;
pub use status::cmd_status;
