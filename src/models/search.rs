use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ProductRecord;

/// A live cached result set, decoded from the `product_cache` table.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub query_hash: String,
    pub query: String,
    pub results: Vec<ProductRecord>,
    pub results_count: i64,
    pub response_time_ms: i64,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hit_count: i64,
}

impl CacheEntry {
    /// Copy of at most `limit` records; the entry itself is left untouched.
    #[must_use]
    pub fn limited(&self, limit: usize) -> Vec<ProductRecord> {
        self.results.iter().take(limit).cloned().collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ProductRecord>,
    pub count: usize,
    pub cached: bool,
    pub response_time_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(n: usize) -> CacheEntry {
        let now = Utc::now();
        CacheEntry {
            query_hash: "abc".to_string(),
            query: "x".to_string(),
            results: (0..n)
                .map(|i| ProductRecord {
                    title: Some(format!("Item {i}")),
                    product_id: None,
                    price: None,
                    extracted_price: None,
                    old_price: None,
                    extracted_old_price: None,
                    source: None,
                    source_icon: None,
                    multiple_sources: false,
                    rating: None,
                    reviews: None,
                    snippet: None,
                    thumbnail: None,
                    brand: None,
                    weight: None,
                    product_link: None,
                    additional_data: crate::models::ProductAttributes::default(),
                })
                .collect(),
            results_count: i64::try_from(n).unwrap(),
            response_time_ms: 10,
            cached_at: now,
            expires_at: now + Duration::seconds(60),
            hit_count: 0,
        }
    }

    #[test]
    fn test_limited_does_not_mutate() {
        let e = entry(5);
        assert_eq!(e.limited(2).len(), 2);
        assert_eq!(e.limited(50).len(), 5);
        assert_eq!(e.results.len(), 5);
    }
}
