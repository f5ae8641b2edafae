use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "product_cache")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub query_hash: String,
    pub query: String,
    #[sea_orm(column_type = "Text")]
    pub results_json: String,
    pub results_count: i64,
    pub response_time_ms: i64,
    pub cached_at: String,
    pub expires_at: String,
    pub hit_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
