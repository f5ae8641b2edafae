use serde::Serialize;

use crate::db::CacheSummary;
use crate::models::SearchResponse;

pub const API_VERSION: &str = "1.0.0";
pub const SERVICE_NAME: &str = "Shopper Product Search";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchPayload {
    #[serde(flatten)]
    pub response: SearchResponse,
    pub api_version: &'static str,
    pub service: &'static str,
    pub limit: usize,
}

impl SearchPayload {
    #[must_use]
    pub const fn new(response: SearchResponse, limit: usize) -> Self {
        Self {
            response,
            api_version: API_VERSION,
            service: SERVICE_NAME,
            limit,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

impl ComponentStatus {
    #[must_use]
    pub const fn from_ok(ok: bool) -> Self {
        if ok { Self::Healthy } else { Self::Unhealthy }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
    pub database: ComponentStatus,
    pub cache: ComponentStatus,
    pub upstream_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub components: HealthComponents,
}

impl HealthReport {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.components.database == ComponentStatus::Healthy
            && self.components.cache == ComponentStatus::Healthy
    }
}

#[derive(Debug, Default, Serialize)]
pub struct UsageDayDto {
    pub date: String,
    pub total_requests: i64,
    pub cached_requests: i64,
    pub api_requests: i64,
    pub cache_hit_rate: f64,
    pub avg_response_time_ms: i64,
    pub total_products_returned: i64,
    pub error_count: i64,
    pub timeout_count: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct UsageTotalsDto {
    pub requests: i64,
    pub cached_requests: i64,
    pub api_calls: i64,
    pub errors: i64,
    pub timeouts: i64,
    pub products_returned: i64,
    pub cache_hit_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct TopQueryDto {
    pub query: String,
    pub search_count: i64,
    pub last_searched: String,
}

#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub today: UsageDayDto,
    pub total: UsageTotalsDto,
    pub cache: CacheSummary,
    pub top_queries: Vec<TopQueryDto>,
}
