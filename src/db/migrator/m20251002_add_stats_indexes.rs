use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_product_cache_expires_at")
                    .table(ProductCache::Table)
                    .col(ProductCache::ExpiresAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_search_queries_search_count")
                    .table(SearchQueries::Table)
                    .col(SearchQueries::SearchCount)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_search_queries_last_searched")
                    .table(SearchQueries::Table)
                    .col(SearchQueries::LastSearched)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared("DROP INDEX IF EXISTS idx_product_cache_expires_at")
            .await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS idx_search_queries_search_count")
            .await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS idx_search_queries_last_searched")
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ProductCache {
    Table,
    ExpiresAt,
}

#[derive(DeriveIden)]
enum SearchQueries {
    Table,
    SearchCount,
    LastSearched,
}
