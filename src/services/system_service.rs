//! Domain service for system-level operations.
//!
//! Handles health probing and usage statistics.

use crate::api::types::{HealthReport, StatsReport};
use thiserror::Error;

/// Errors specific to system operations.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for SystemError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SystemError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Domain service trait for system operations.
#[async_trait::async_trait]
pub trait SystemService: Send + Sync {
    /// Probes the database and the cache table.
    ///
    /// Never fails: an unreachable component is reported as `unhealthy`
    /// and the overall status becomes `degraded`.
    async fn health(&self) -> HealthReport;

    /// Aggregates usage statistics.
    ///
    /// Combines today's counters, all-time sums, cache aggregates and the
    /// most searched queries.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::Database`] on connection failures.
    async fn stats(&self, top_queries: u64) -> Result<StatsReport, SystemError>;

    /// Deletes expired cache entries, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError::Database`] on connection failures.
    async fn purge_expired(&self) -> Result<u64, SystemError>;
}
