use crate::db::format_timestamp;
use crate::entities::{api_usage_stats, prelude::*};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, OnConflict, SimpleExpr};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set};
use serde::Serialize;

/// One outcome to fold into a day's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageEvent {
    pub cached: bool,
    pub response_time_ms: i64,
    pub results_count: i64,
    pub error: bool,
    pub timeout: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageTotals {
    pub total_requests: i64,
    pub cached_requests: i64,
    pub api_requests: i64,
    pub error_count: i64,
    pub timeout_count: i64,
    pub total_products_returned: i64,
}

impl UsageTotals {
    #[must_use]
    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.cached_requests as f64 / self.total_requests as f64 * 100.0;
        rate
    }
}

#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub struct UsageRepository {
    conn: DatabaseConnection,
}

impl UsageRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Folds `event` into the row for `date` in a single statement, so
    /// concurrent recorders never lose an increment.
    pub async fn record(&self, date: NaiveDate, event: UsageEvent) -> Result<()> {
        let now = format_timestamp(Utc::now());
        let cached = i64::from(event.cached);
        let api = i64::from(!event.cached);
        let errors = i64::from(event.error);
        let timeouts = i64::from(event.timeout);

        let active_model = api_usage_stats::ActiveModel {
            date: Set(date_key(date)),
            total_requests: Set(1),
            cached_requests: Set(cached),
            api_requests: Set(api),
            avg_response_time_ms: Set(Some(event.response_time_ms)),
            total_products_returned: Set(event.results_count),
            error_count: Set(errors),
            timeout_count: Set(timeouts),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        ApiUsageStats::insert(active_model)
            .on_conflict(
                OnConflict::column(api_usage_stats::Column::Date)
                    .value(
                        api_usage_stats::Column::TotalRequests,
                        increment(api_usage_stats::Column::TotalRequests, 1),
                    )
                    .value(
                        api_usage_stats::Column::CachedRequests,
                        increment(api_usage_stats::Column::CachedRequests, cached),
                    )
                    .value(
                        api_usage_stats::Column::ApiRequests,
                        increment(api_usage_stats::Column::ApiRequests, api),
                    )
                    .value(
                        api_usage_stats::Column::AvgResponseTimeMs,
                        Expr::cust_with_values(
                            "(COALESCE(\"api_usage_stats\".\"avg_response_time_ms\", 0) \
                             * \"api_usage_stats\".\"total_requests\" + ?) \
                             / (\"api_usage_stats\".\"total_requests\" + 1)",
                            [event.response_time_ms],
                        ),
                    )
                    .value(
                        api_usage_stats::Column::TotalProductsReturned,
                        increment(
                            api_usage_stats::Column::TotalProductsReturned,
                            event.results_count,
                        ),
                    )
                    .value(
                        api_usage_stats::Column::ErrorCount,
                        increment(api_usage_stats::Column::ErrorCount, errors),
                    )
                    .value(
                        api_usage_stats::Column::TimeoutCount,
                        increment(api_usage_stats::Column::TimeoutCount, timeouts),
                    )
                    .update_column(api_usage_stats::Column::UpdatedAt)
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn get(&self, date: NaiveDate) -> Result<Option<api_usage_stats::Model>> {
        let row = ApiUsageStats::find()
            .filter(api_usage_stats::Column::Date.eq(date_key(date)))
            .one(&self.conn)
            .await?;
        Ok(row)
    }

    pub async fn totals(&self) -> Result<UsageTotals> {
        type SumRow = (
            Option<i64>,
            Option<i64>,
            Option<i64>,
            Option<i64>,
            Option<i64>,
            Option<i64>,
        );

        let row: Option<SumRow> = ApiUsageStats::find()
            .select_only()
            .column_as(sum(api_usage_stats::Column::TotalRequests), "total_requests")
            .column_as(sum(api_usage_stats::Column::CachedRequests), "cached_requests")
            .column_as(sum(api_usage_stats::Column::ApiRequests), "api_requests")
            .column_as(sum(api_usage_stats::Column::ErrorCount), "error_count")
            .column_as(sum(api_usage_stats::Column::TimeoutCount), "timeout_count")
            .column_as(
                sum(api_usage_stats::Column::TotalProductsReturned),
                "total_products_returned",
            )
            .into_tuple()
            .one(&self.conn)
            .await?;

        Ok(row.map_or_else(
            UsageTotals::default,
            |(total, cached, api, errors, timeouts, products)| UsageTotals {
                total_requests: total.unwrap_or(0),
                cached_requests: cached.unwrap_or(0),
                api_requests: api.unwrap_or(0),
                error_count: errors.unwrap_or(0),
                timeout_count: timeouts.unwrap_or(0),
                total_products_returned: products.unwrap_or(0),
            },
        ))
    }
}

fn increment(column: api_usage_stats::Column, by: i64) -> SimpleExpr {
    Expr::col((ApiUsageStats, column)).add(by)
}

fn sum(column: api_usage_stats::Column) -> SimpleExpr {
    Expr::col(column).sum()
}
