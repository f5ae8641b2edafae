pub use super::api_usage_stats::Entity as ApiUsageStats;
pub use super::product_cache::Entity as ProductCache;
pub use super::search_queries::Entity as SearchQueries;
