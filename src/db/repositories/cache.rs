use crate::db::{format_timestamp, parse_timestamp};
use crate::entities::{prelude::*, product_cache};
use crate::models::{CacheEntry, ProductRecord};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::sea_query::{Expr, Func, OnConflict, SimpleExpr};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set};
use serde::Serialize;
use tracing::debug;

pub struct CacheRepository {
    conn: DatabaseConnection,
    ttl: Duration,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheSummary {
    pub total_entries: i64,
    pub total_hits: i64,
    pub avg_response_time_ms: i64,
}

impl CacheRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection, ttl: Duration) -> Self {
        Self { conn, ttl }
    }

    /// Returns the live entry for `query_hash`. An expired entry is deleted and
    /// reported as absent.
    pub async fn lookup(&self, query_hash: &str) -> Result<Option<CacheEntry>> {
        let Some(row) = ProductCache::find()
            .filter(product_cache::Column::QueryHash.eq(query_hash))
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let now = Utc::now();
        let live = parse_timestamp(&row.expires_at).is_some_and(|expires_at| now <= expires_at);

        if !live {
            // Only the row version we observed is removed; an entry refreshed
            // concurrently carries a new expires_at and survives.
            let deleted = ProductCache::delete_many()
                .filter(product_cache::Column::QueryHash.eq(query_hash))
                .filter(product_cache::Column::ExpiresAt.eq(row.expires_at.as_str()))
                .exec(&self.conn)
                .await?;
            debug!(
                query_hash,
                deleted = deleted.rows_affected,
                "Evicted expired cache entry"
            );
            return Ok(None);
        }

        Self::decode(row).map(Some)
    }

    pub async fn store(
        &self,
        query_hash: &str,
        query: &str,
        records: &[ProductRecord],
        response_time_ms: i64,
    ) -> Result<()> {
        let results_json = serde_json::to_string(records)?;
        let now = Utc::now();

        let active_model = product_cache::ActiveModel {
            query_hash: Set(query_hash.to_string()),
            query: Set(query.to_string()),
            results_json: Set(results_json),
            results_count: Set(i64::try_from(records.len()).unwrap_or(i64::MAX)),
            response_time_ms: Set(response_time_ms),
            cached_at: Set(format_timestamp(now)),
            expires_at: Set(format_timestamp(now + self.ttl)),
            hit_count: Set(0),
            ..Default::default()
        };

        ProductCache::insert(active_model)
            .on_conflict(
                OnConflict::column(product_cache::Column::QueryHash)
                    .update_columns([
                        product_cache::Column::Query,
                        product_cache::Column::ResultsJson,
                        product_cache::Column::ResultsCount,
                        product_cache::Column::ResponseTimeMs,
                        product_cache::Column::CachedAt,
                        product_cache::Column::ExpiresAt,
                        product_cache::Column::HitCount,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn record_hit(&self, query_hash: &str) -> Result<()> {
        ProductCache::update_many()
            .col_expr(
                product_cache::Column::HitCount,
                Expr::col(product_cache::Column::HitCount).add(1),
            )
            .filter(product_cache::Column::QueryHash.eq(query_hash))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64> {
        let now = format_timestamp(Utc::now());
        let result = ProductCache::delete_many()
            .filter(product_cache::Column::ExpiresAt.lt(now))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn summary(&self) -> Result<CacheSummary> {
        let row: Option<(i64, Option<i64>, Option<f64>)> = ProductCache::find()
            .select_only()
            .column_as(Expr::col(product_cache::Column::Id).count(), "total_entries")
            .column_as(Expr::col(product_cache::Column::HitCount).sum(), "total_hits")
            .column_as(
                SimpleExpr::from(Func::avg(Expr::col(product_cache::Column::ResponseTimeMs))),
                "avg_response_time",
            )
            .into_tuple()
            .one(&self.conn)
            .await?;

        Ok(row.map_or_else(CacheSummary::default, |(entries, hits, avg)| {
            #[allow(clippy::cast_possible_truncation)]
            let avg_response_time_ms = avg.unwrap_or(0.0) as i64;
            CacheSummary {
                total_entries: entries,
                total_hits: hits.unwrap_or(0),
                avg_response_time_ms,
            }
        }))
    }

    fn decode(row: product_cache::Model) -> Result<CacheEntry> {
        let results: Vec<ProductRecord> = serde_json::from_str(&row.results_json)
            .with_context(|| format!("Corrupt cached results for {}", row.query_hash))?;
        let cached_at = parse_timestamp(&row.cached_at).unwrap_or_else(Utc::now);
        let expires_at = parse_timestamp(&row.expires_at).unwrap_or(cached_at);

        Ok(CacheEntry {
            query_hash: row.query_hash,
            query: row.query,
            results,
            results_count: row.results_count,
            response_time_ms: row.response_time_ms,
            cached_at,
            expires_at,
            hit_count: row.hit_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    fn record(title: &str) -> ProductRecord {
        crate::parser::extract_product(crate::parser::RawProduct {
            title: Some(title.to_string()),
            ..Default::default()
        })
    }

    async fn repo(ttl: Duration) -> CacheRepository {
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();
        CacheRepository::new(store.conn, ttl)
    }

    #[tokio::test]
    async fn test_store_then_lookup_counts_hits() {
        let repo = repo(Duration::hours(1)).await;
        let records = vec![record("One"), record("Two"), record("Three")];

        repo.store("key", "x", &records, 120).await.unwrap();

        let entry = repo.lookup("key").await.unwrap().unwrap();
        assert_eq!(entry.results, records);
        assert_eq!(entry.hit_count, 0);
        assert_eq!(entry.response_time_ms, 120);
        assert_eq!(entry.results_count, 3);

        repo.record_hit("key").await.unwrap();

        let entry = repo.lookup("key").await.unwrap().unwrap();
        assert_eq!(entry.hit_count, 1);
        assert_eq!(entry.results, records);
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted() {
        let repo = repo(Duration::seconds(-5)).await;
        repo.store("key", "x", &[record("One")], 50).await.unwrap();

        assert!(repo.lookup("key").await.unwrap().is_none());
        assert!(repo.lookup("key").await.unwrap().is_none());

        let remaining = ProductCache::find().all(&repo.conn).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_store_overwrites_and_resets_hits() {
        let repo = repo(Duration::hours(1)).await;
        repo.store("key", "x", &[record("Old")], 10).await.unwrap();
        repo.record_hit("key").await.unwrap();
        repo.record_hit("key").await.unwrap();

        repo.store("key", "x", &[record("New A"), record("New B")], 20)
            .await
            .unwrap();

        let entry = repo.lookup("key").await.unwrap().unwrap();
        assert_eq!(entry.hit_count, 0);
        assert_eq!(entry.results.len(), 2);
        assert_eq!(entry.response_time_ms, 20);

        let rows = ProductCache::find().all(&repo.conn).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_record_hit_on_missing_key_is_noop() {
        let repo = repo(Duration::hours(1)).await;
        repo.record_hit("absent").await.unwrap();
        assert!(repo.lookup("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_and_summary() {
        let live = repo(Duration::hours(1)).await;
        live.store("a", "a", &[record("One")], 100).await.unwrap();
        live.store("b", "b", &[record("Two")], 300).await.unwrap();
        live.record_hit("a").await.unwrap();

        let summary = live.summary().await.unwrap();
        assert_eq!(summary.total_entries, 2);
        assert_eq!(summary.total_hits, 1);
        assert_eq!(summary.avg_response_time_ms, 200);

        let expired = CacheRepository::new(live.conn.clone(), Duration::seconds(-1));
        expired.store("c", "c", &[record("Three")], 5).await.unwrap();
        assert_eq!(live.purge_expired().await.unwrap(), 1);
        assert_eq!(live.summary().await.unwrap().total_entries, 2);
    }
}
