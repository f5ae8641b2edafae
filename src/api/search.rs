use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, SearchPayload};

/// `limit` is kept as raw text so that malformed values fall back to the
/// default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ProductSearchParams {
    pub q: Option<String>,
    pub limit: Option<String>,
}

/// `GET /api/products/search?q=<query>&limit=<n>`
pub async fn search_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProductSearchParams>,
) -> Result<Json<ApiResponse<SearchPayload>>, ApiError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::missing_query());
    }

    let limit = state.config().search.resolve_limit(params.limit.as_deref());

    let response = state.search_service().search(query, limit).await?;

    Ok(Json(ApiResponse::success(SearchPayload::new(response, limit))))
}
