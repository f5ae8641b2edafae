use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "api_usage_stats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// UTC calendar day, `YYYY-MM-DD`.
    #[sea_orm(unique)]
    pub date: String,
    pub total_requests: i64,
    pub cached_requests: i64,
    /// Requests that reached the upstream API.
    pub api_requests: i64,
    pub avg_response_time_ms: Option<i64>,
    pub total_products_returned: i64,
    pub error_count: i64,
    pub timeout_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Model {
    /// Percentage of requests served from cache.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.cached_requests as f64 / self.total_requests as f64 * 100.0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
