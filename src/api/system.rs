//! System API endpoints.
//!
//! Health probes and usage statistics. All aggregation is delegated to
//! [`SystemService`](crate::services::SystemService).

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, StatsReport};

/// Number of entries listed under `top_queries`.
const TOP_QUERIES: u64 = 10;

#[derive(Debug, Serialize)]
pub struct HealthLiveResponse {
    pub status: &'static str,
}

/// `GET /health`
///
/// Lightweight liveness probe to indicate the API process is running.
pub async fn health_live() -> impl IntoResponse {
    Json(ApiResponse::success(HealthLiveResponse { status: "alive" }))
}

/// `GET /api/health`
///
/// Checks database connectivity and the cache table; 503 when degraded.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let report = state.system_service().health().await;

    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ApiResponse::success(report))).into_response()
}

/// `GET /api/stats`
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<StatsReport>>, ApiError> {
    let stats = state.system_service().stats(TOP_QUERIES).await?;
    Ok(Json(ApiResponse::success(stats)))
}
