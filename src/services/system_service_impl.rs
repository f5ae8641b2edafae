//! `SeaORM` implementation of the `SystemService` trait.

use crate::api::types::{
    ComponentStatus, HealthComponents, HealthReport, SERVICE_NAME, StatsReport, TopQueryDto,
    UsageDayDto, UsageTotalsDto,
};
use crate::db::{Store, date_key};
use crate::services::system_service::{SystemError, SystemService};
use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

pub struct SeaOrmSystemService {
    store: Store,
    upstream_configured: bool,
}

impl SeaOrmSystemService {
    #[must_use]
    pub const fn new(store: Store, upstream_configured: bool) -> Self {
        Self {
            store,
            upstream_configured,
        }
    }
}

#[async_trait]
impl SystemService for SeaOrmSystemService {
    async fn health(&self) -> HealthReport {
        let database = match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                false
            }
        };

        let cache = match self.store.cache_probe().await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Cache health check failed");
                false
            }
        };

        let components = HealthComponents {
            database: ComponentStatus::from_ok(database),
            cache: ComponentStatus::from_ok(cache),
            upstream_configured: self.upstream_configured,
        };

        let mut report = HealthReport {
            status: "healthy",
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            components,
        };
        if !report.is_healthy() {
            report.status = "degraded";
        }
        report
    }

    async fn stats(&self, top_queries: u64) -> Result<StatsReport, SystemError> {
        let today_date = Utc::now().date_naive();

        let today = self
            .store
            .get_usage(today_date)
            .await?
            .map_or_else(
                || UsageDayDto {
                    date: date_key(today_date),
                    ..Default::default()
                },
                |row| UsageDayDto {
                    cache_hit_rate: row.cache_hit_rate(),
                    date: row.date,
                    total_requests: row.total_requests,
                    cached_requests: row.cached_requests,
                    api_requests: row.api_requests,
                    avg_response_time_ms: row.avg_response_time_ms.unwrap_or(0),
                    total_products_returned: row.total_products_returned,
                    error_count: row.error_count,
                    timeout_count: row.timeout_count,
                },
            );

        let totals = self.store.usage_totals().await?;
        let total = UsageTotalsDto {
            cache_hit_rate: totals.cache_hit_rate(),
            requests: totals.total_requests,
            cached_requests: totals.cached_requests,
            api_calls: totals.api_requests,
            errors: totals.error_count,
            timeouts: totals.timeout_count,
            products_returned: totals.total_products_returned,
        };

        let cache = self.store.cache_summary().await?;

        let top_queries = self
            .store
            .top_queries(top_queries)
            .await?
            .into_iter()
            .map(|q| TopQueryDto {
                query: q.query,
                search_count: q.search_count,
                last_searched: q.last_searched,
            })
            .collect();

        Ok(StatsReport {
            today,
            total,
            cache,
            top_queries,
        })
    }

    async fn purge_expired(&self) -> Result<u64, SystemError> {
        Ok(self.store.purge_expired_cache().await?)
    }
}
