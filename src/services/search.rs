use crate::clients::{UpstreamError, UpstreamSearch};
use crate::db::{Store, UsageEvent};
use crate::models::{CacheEntry, ProductRecord, SearchResponse};
use crate::parser::{QueryKey, extract_value, query_key};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Search service temporarily unavailable: {0}")]
    UpstreamUnavailable(#[source] UpstreamError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SearchError {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::Internal(_) => "internal",
        }
    }
}

/// Cache-aside search over the upstream shopping engine.
pub struct SearchService {
    store: Store,
    upstream: Arc<dyn UpstreamSearch>,
    max_upstream_results: usize,
}

impl SearchService {
    #[must_use]
    pub fn new(store: Store, upstream: Arc<dyn UpstreamSearch>, max_upstream_results: usize) -> Self {
        Self {
            store,
            upstream,
            max_upstream_results,
        }
    }

    #[instrument(skip(self), fields(cached = tracing::field::Empty))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResponse, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::Validation("Query cannot be empty".to_string()));
        }
        if limit == 0 {
            return Err(SearchError::Validation("Limit must be at least 1".to_string()));
        }

        let key = query_key(query);

        if let Some(entry) = self.cached(&key).await {
            tracing::Span::current().record("cached", true);
            return Ok(self.serve_hit(query, &key, &entry, limit).await);
        }

        tracing::Span::current().record("cached", false);
        metrics::counter!("search_cache_misses_total").increment(1);
        self.fetch(query, &key, limit).await
    }

    async fn cached(&self, key: &QueryKey) -> Option<CacheEntry> {
        match self.store.lookup_cached(key.as_str()).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn serve_hit(
        &self,
        query: &str,
        key: &QueryKey,
        entry: &CacheEntry,
        limit: usize,
    ) -> SearchResponse {
        let results = entry.limited(limit);

        if let Err(e) = self.store.record_cache_hit(key.as_str()).await {
            warn!(error = %e, "Failed to record cache hit");
        }

        self.account(UsageEvent {
            cached: true,
            response_time_ms: entry.response_time_ms,
            results_count: count_i64(results.len()),
            ..Default::default()
        })
        .await;

        metrics::counter!("search_cache_hits_total").increment(1);
        metrics::counter!("search_requests_total", "outcome" => "hit").increment(1);
        debug!(query, count = results.len(), "Served from cache");

        SearchResponse {
            query: query.to_string(),
            count: results.len(),
            results,
            cached: true,
            response_time_ms: entry.response_time_ms,
        }
    }

    async fn fetch(
        &self,
        query: &str,
        key: &QueryKey,
        limit: usize,
    ) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();
        let raw = match self
            .upstream
            .search(query, self.max_upstream_results.max(1))
            .await
        {
            Ok(raw) => raw,
            Err(e) => return Err(self.fail(query, e).await),
        };

        let elapsed = started.elapsed();
        metrics::histogram!("search_upstream_duration_seconds").record(elapsed.as_secs_f64());

        let records = extract_all(raw);
        let response_time_ms = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        let total = count_i64(records.len());

        if let Err(e) = self
            .store
            .cache_results(key.as_str(), query, &records, response_time_ms)
            .await
        {
            error!(error = %e, "Failed to cache results");
        }

        if let Err(e) = self
            .store
            .record_query_stats(key.as_str(), query, response_time_ms, total)
            .await
        {
            error!(error = %e, "Failed to update search query stats");
        }

        self.account(UsageEvent {
            cached: false,
            response_time_ms,
            results_count: total,
            ..Default::default()
        })
        .await;

        metrics::counter!("search_requests_total", "outcome" => "miss").increment(1);
        info!(
            query,
            fetched = records.len(),
            response_time_ms,
            "Fetched products from upstream"
        );

        let results: Vec<ProductRecord> = records.into_iter().take(limit).collect();
        Ok(SearchResponse {
            query: query.to_string(),
            count: results.len(),
            results,
            cached: false,
            response_time_ms,
        })
    }

    async fn fail(&self, query: &str, err: UpstreamError) -> SearchError {
        metrics::counter!("search_upstream_errors_total").increment(1);

        self.account(UsageEvent {
            error: true,
            timeout: err.is_timeout(),
            ..Default::default()
        })
        .await;

        if let UpstreamError::Config(message) = err {
            error!(query, %message, "Upstream client is misconfigured");
            metrics::counter!("search_requests_total", "outcome" => "internal_error").increment(1);
            return SearchError::Internal(message);
        }

        error!(query, error = %err, "Upstream search failed");
        metrics::counter!("search_requests_total", "outcome" => "upstream_error").increment(1);
        SearchError::UpstreamUnavailable(err)
    }

    async fn account(&self, event: UsageEvent) {
        let today = Utc::now().date_naive();
        if let Err(e) = self.store.record_usage(today, event).await {
            error!(error = %e, "Failed to update API usage stats");
        }
    }
}

/// Extracts every record, skipping the ones that fail individually.
fn extract_all(raw: Vec<serde_json::Value>) -> Vec<ProductRecord> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| match extract_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed product record");
                None
            }
        })
        .collect()
}

fn count_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Upstream stub that replays a fixed outcome and records calls.
    struct StubUpstream {
        outcome: Box<dyn Fn() -> Result<Vec<Value>, UpstreamError> + Send + Sync>,
        calls: AtomicUsize,
        last_max: AtomicUsize,
    }

    impl StubUpstream {
        fn returning(n: usize) -> Arc<Self> {
            Self::with(move || Ok(products(n)))
        }

        fn with(
            f: impl Fn() -> Result<Vec<Value>, UpstreamError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                outcome: Box::new(f),
                calls: AtomicUsize::new(0),
                last_max: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl UpstreamSearch for StubUpstream {
        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<Value>, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_max.store(max_results, Ordering::SeqCst);
            (self.outcome)().map(|raw| raw.into_iter().take(max_results).collect())
        }
    }

    fn products(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({ "title": format!("Brand Product {i} 16 oz"), "position": i }))
            .collect()
    }

    async fn service(upstream: Arc<StubUpstream>) -> (SearchService, Store) {
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();
        (SearchService::new(store.clone(), upstream, 100), store)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let upstream = StubUpstream::returning(5);
        let (service, store) = service(upstream.clone()).await;

        let first = service.search("Peanut Butter", 2).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.count, 2);
        assert_eq!(first.results.len(), 2);
        assert_eq!(first.query, "Peanut Butter");

        let second = service.search("  peanut butter ", 10).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.count, 5);
        assert_eq!(second.response_time_ms, first.response_time_ms);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);

        let key = query_key("peanut butter");
        let entry = store.lookup_cached(key.as_str()).await.unwrap().unwrap();
        assert_eq!(entry.results.len(), 5);
        assert_eq!(entry.hit_count, 1);

        let stats = store.get_query_stats(key.as_str()).await.unwrap().unwrap();
        assert_eq!(stats.search_count, 1);
        assert_eq!(stats.results_count, Some(5));

        let usage = store
            .get_usage(Utc::now().date_naive())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(usage.total_requests, 2);
        assert_eq!(usage.cached_requests, 1);
        assert_eq!(usage.api_requests, 1);
        assert_eq!(usage.total_products_returned, 10);
    }

    #[tokio::test]
    async fn test_hit_with_small_limit_keeps_entry_whole() {
        let (service, store) = service(StubUpstream::returning(5)).await;
        service.search("honey", 50).await.unwrap();

        let hit = service.search("honey", 2).await.unwrap();
        assert!(hit.cached);
        assert_eq!(hit.results.len(), 2);

        let again = service.search("honey", 50).await.unwrap();
        assert_eq!(again.results.len(), 5);

        let entry = store
            .lookup_cached(query_key("honey").as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.results.len(), 5);
        assert_eq!(entry.hit_count, 2);
    }

    #[tokio::test]
    async fn test_upstream_request_is_capped() {
        let upstream = StubUpstream::returning(3);
        let (service, _store) = service(upstream.clone()).await;

        service.search("a", 500).await.unwrap();
        assert_eq!(upstream.last_max.load(Ordering::SeqCst), 100);

        service.search("b", 7).await.unwrap();
        assert_eq!(upstream.last_max.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn test_small_limit_miss_caches_full_result_set() {
        let upstream = StubUpstream::returning(30);
        let (service, store) = service(upstream.clone()).await;

        let first = service.search("peanut butter", 2).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.count, 2);

        let second = service.search("Peanut Butter", 25).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.count, 25);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);

        let entry = store
            .lookup_cached(query_key("peanut butter").as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.results.len(), 30);
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable_and_leaves_cache_untouched() {
        let (service, store) = service(StubUpstream::with(|| Err(UpstreamError::Timeout))).await;

        let err = service.search("almond butter", 10).await.unwrap_err();
        assert!(matches!(err, SearchError::UpstreamUnavailable(UpstreamError::Timeout)));
        assert_eq!(err.kind(), "upstream_unavailable");

        let key = query_key("almond butter");
        assert!(store.lookup_cached(key.as_str()).await.unwrap().is_none());
        assert!(store.get_query_stats(key.as_str()).await.unwrap().is_none());

        let usage = store
            .get_usage(Utc::now().date_naive())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(usage.error_count, 1);
        assert_eq!(usage.timeout_count, 1);
        assert_eq!(usage.total_requests, 1);
        assert_eq!(usage.avg_response_time_ms, Some(0));
    }

    #[tokio::test]
    async fn test_reported_error_is_unavailable() {
        let (service, store) = service(StubUpstream::with(|| {
            Err(UpstreamError::Reported("Invalid API key".to_string()))
        }))
        .await;

        let err = service.search("x", 10).await.unwrap_err();
        assert!(matches!(err, SearchError::UpstreamUnavailable(_)));

        let usage = store
            .get_usage(Utc::now().date_naive())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(usage.error_count, 1);
        assert_eq!(usage.timeout_count, 0);
    }

    #[tokio::test]
    async fn test_misconfiguration_is_internal() {
        let (service, store) = service(StubUpstream::with(|| {
            Err(UpstreamError::Config("API key is not set".to_string()))
        }))
        .await;

        let err = service.search("x", 10).await.unwrap_err();
        assert!(matches!(err, SearchError::Internal(_)));
        assert_eq!(err.kind(), "internal");

        let usage = store
            .get_usage(Utc::now().date_naive())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(usage.error_count, 1);
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped() {
        let upstream = StubUpstream::with(|| {
            Ok(vec![
                json!({ "title": "Good One" }),
                json!("not an object"),
                json!({ "title": "Bad", "reviews": "lots" }),
                json!({ "title": "Good Two" }),
            ])
        });
        let (service, _store) = service(upstream).await;

        let response = service.search("mixed", 10).await.unwrap();
        let titles: Vec<_> = response
            .results
            .iter()
            .filter_map(|r| r.title.as_deref())
            .collect();
        assert_eq!(titles, vec!["Good One", "Good Two"]);
    }

    #[tokio::test]
    async fn test_empty_upstream_result_is_cached() {
        let upstream = StubUpstream::returning(0);
        let (service, _store) = service(upstream.clone()).await;

        let first = service.search("nothing", 10).await.unwrap();
        assert_eq!(first.count, 0);
        let second = service.search("nothing", 10).await.unwrap();
        assert!(second.cached);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validation() {
        let upstream = StubUpstream::returning(1);
        let (service, _store) = service(upstream.clone()).await;

        assert!(matches!(
            service.search("   ", 10).await,
            Err(SearchError::Validation(_))
        ));
        assert!(matches!(
            service.search("x", 0).await,
            Err(SearchError::Validation(_))
        ));
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_misses_last_write_wins() {
        let path = std::env::temp_dir().join(format!("shopper-{}.db", uuid::Uuid::new_v4()));
        let db_url = format!("sqlite:{}", path.display());
        let store = Store::with_pool_options(&db_url, 4, 1).await.unwrap();

        let upstream = StubUpstream::returning(4);
        let service = Arc::new(SearchService::new(store.clone(), upstream.clone(), 100));

        let a = tokio::spawn({
            let service = service.clone();
            async move { service.search("race", 10).await }
        });
        let b = tokio::spawn({
            let service = service.clone();
            async move { service.search("race", 10).await }
        });

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert_eq!(a.results.len(), 4);
        assert_eq!(b.results.len(), 4);

        let entry = store
            .lookup_cached(query_key("race").as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.results.len(), 4);

        let usage = store
            .get_usage(Utc::now().date_naive())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(usage.total_requests, 2);

        drop(service);
        drop(store);
        let _ = std::fs::remove_file(path);
    }
}
