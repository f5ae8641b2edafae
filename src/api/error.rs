use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::services::{SearchError, SystemError};

pub const SEARCH_EXAMPLE: &str = "/api/products/search?q=365+WholeFoods+Peanut+Butter";

#[derive(Debug)]
pub enum ApiError {
    DatabaseError(String),

    UpstreamUnavailable(String),

    ValidationError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::UpstreamUnavailable(msg) => write!(f, "Upstream unavailable: {msg}"),
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            Self::UpstreamUnavailable(msg) => {
                tracing::warn!("Upstream error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Search service temporarily unavailable".to_string(),
                )
            }
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Validation(msg) => Self::validation(msg),
            SearchError::UpstreamUnavailable(e) => Self::UpstreamUnavailable(e.to_string()),
            SearchError::Internal(msg) => Self::internal(msg),
        }
    }
}

impl From<SystemError> for ApiError {
    fn from(err: SystemError) -> Self {
        match err {
            SystemError::Database(msg) => Self::DatabaseError(msg),
            SystemError::Internal(msg) => Self::internal(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn missing_query() -> Self {
        Self::ValidationError(format!(
            "Query parameter \"q\" is required. Example: {SEARCH_EXAMPLE}"
        ))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}
