use crate::db::format_timestamp;
use crate::entities::{prelude::*, search_queries};
use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};

pub struct QueryStatsRepository {
    conn: DatabaseConnection,
}

impl QueryStatsRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Bumps the search count for `query_hash`, keeping the first-seen query text.
    pub async fn record(
        &self,
        query_hash: &str,
        query: &str,
        response_time_ms: i64,
        results_count: i64,
    ) -> Result<()> {
        let now = format_timestamp(Utc::now());

        let active_model = search_queries::ActiveModel {
            query: Set(query.to_string()),
            query_hash: Set(query_hash.to_string()),
            search_count: Set(1),
            last_searched: Set(now.clone()),
            created_at: Set(now),
            response_time_ms: Set(Some(response_time_ms)),
            results_count: Set(Some(results_count)),
            ..Default::default()
        };

        SearchQueries::insert(active_model)
            .on_conflict(
                OnConflict::column(search_queries::Column::QueryHash)
                    .value(
                        search_queries::Column::SearchCount,
                        Expr::col((SearchQueries, search_queries::Column::SearchCount)).add(1),
                    )
                    .update_columns([
                        search_queries::Column::LastSearched,
                        search_queries::Column::ResponseTimeMs,
                        search_queries::Column::ResultsCount,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn get(&self, query_hash: &str) -> Result<Option<search_queries::Model>> {
        let row = SearchQueries::find()
            .filter(search_queries::Column::QueryHash.eq(query_hash))
            .one(&self.conn)
            .await?;
        Ok(row)
    }

    pub async fn top(&self, limit: u64) -> Result<Vec<search_queries::Model>> {
        let rows = SearchQueries::find()
            .order_by_desc(search_queries::Column::SearchCount)
            .order_by_desc(search_queries::Column::LastSearched)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(rows)
    }
}
