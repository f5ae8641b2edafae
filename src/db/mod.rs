use crate::entities::{api_usage_stats, prelude::ProductCache, search_queries};
use crate::models::{CacheEntry, ProductRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::cache::CacheSummary;
pub use repositories::usage::{UsageEvent, UsageTotals, date_key};

/// Default lifetime of a cached result set.
pub const DEFAULT_CACHE_TTL_SECONDS: i64 = 3600;

/// Timestamps are stored as fixed-width RFC 3339 strings so that text
/// comparison in SQL matches chronological order.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Clone, Debug)]
pub struct Store {
    pub conn: DatabaseConnection,
    cache_ttl: chrono::Duration,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:");
        if !path_str.starts_with(":memory:") {
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)
                    .with_context(|| format!("Failed to create database file {path_str}"))?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self {
            conn,
            cache_ttl: chrono::Duration::seconds(DEFAULT_CACHE_TTL_SECONDS),
        })
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn cache_ttl(&self) -> chrono::Duration {
        self.cache_ttl
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn cache_repo(&self) -> repositories::cache::CacheRepository {
        repositories::cache::CacheRepository::new(self.conn.clone(), self.cache_ttl)
    }

    fn usage_repo(&self) -> repositories::usage::UsageRepository {
        repositories::usage::UsageRepository::new(self.conn.clone())
    }

    fn query_stats_repo(&self) -> repositories::query_stats::QueryStatsRepository {
        repositories::query_stats::QueryStatsRepository::new(self.conn.clone())
    }

    // ========== Cache Store ==========

    pub async fn lookup_cached(&self, query_hash: &str) -> Result<Option<CacheEntry>> {
        self.cache_repo().lookup(query_hash).await
    }

    pub async fn cache_results(
        &self,
        query_hash: &str,
        query: &str,
        records: &[ProductRecord],
        response_time_ms: i64,
    ) -> Result<()> {
        self.cache_repo()
            .store(query_hash, query, records, response_time_ms)
            .await
    }

    pub async fn record_cache_hit(&self, query_hash: &str) -> Result<()> {
        self.cache_repo().record_hit(query_hash).await
    }

    pub async fn purge_expired_cache(&self) -> Result<u64> {
        self.cache_repo().purge_expired().await
    }

    pub async fn cache_summary(&self) -> Result<CacheSummary> {
        self.cache_repo().summary().await
    }

    /// Confirms the cache table is readable.
    pub async fn cache_probe(&self) -> Result<u64> {
        Ok(ProductCache::find().count(&self.conn).await?)
    }

    // ========== Usage Accountant ==========

    pub async fn record_usage(&self, date: NaiveDate, event: UsageEvent) -> Result<()> {
        self.usage_repo().record(date, event).await
    }

    pub async fn get_usage(&self, date: NaiveDate) -> Result<Option<api_usage_stats::Model>> {
        self.usage_repo().get(date).await
    }

    pub async fn usage_totals(&self) -> Result<UsageTotals> {
        self.usage_repo().totals().await
    }

    // ========== Query Stats ==========

    pub async fn record_query_stats(
        &self,
        query_hash: &str,
        query: &str,
        response_time_ms: i64,
        results_count: i64,
    ) -> Result<()> {
        self.query_stats_repo()
            .record(query_hash, query, response_time_ms, results_count)
            .await
    }

    pub async fn get_query_stats(&self, query_hash: &str) -> Result<Option<search_queries::Model>> {
        self.query_stats_repo().get(query_hash).await
    }

    pub async fn top_queries(&self, limit: u64) -> Result<Vec<search_queries::Model>> {
        self.query_stats_repo().top(limit).await
    }
}
