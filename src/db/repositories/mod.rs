pub mod cache;
pub mod query_stats;
pub mod usage;
