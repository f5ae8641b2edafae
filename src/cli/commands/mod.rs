mod purge;
mod search;
mod stats;

pub use purge::cmd_purge;
pub use search::cmd_search_products;
pub use stats::cmd_stats;
