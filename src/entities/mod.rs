pub mod prelude;

pub mod api_usage_stats;
pub mod product_cache;
pub mod search_queries;
