//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.
//!
//! Failures of individual queries in a batch are not `ApiError`s; they are
//! reported inline in the batch result.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::query::QueryError;
use crate::upstream::UpstreamError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// A single query failed outside of a batch
    #[error("{0}")]
    Query(#[from] QueryError),

    /// The upstream API failed a non-query call
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Query(e) => (
                StatusCode::from_u16(e.status()).unwrap_or(StatusCode::BAD_REQUEST),
                e.code(),
            ),
            ApiError::Upstream(UpstreamError::Timeout) => {
                (StatusCode::GATEWAY_TIMEOUT, "TRANSPORT_ERROR")
            }
            ApiError::Upstream(UpstreamError::Unavailable(_) | UpstreamError::Request(_)) => {
                (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR")
            }
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error occurred"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_errors_are_bad_requests() {
        let err = ApiError::from(QueryError::Data("no data".into()));
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "DATA_ERROR"));
        assert_eq!(err.to_string(), "no data");
    }

    #[test]
    fn test_upstream_errors() {
        let err = ApiError::from(UpstreamError::Timeout);
        assert_eq!(err.status_and_code().0, StatusCode::GATEWAY_TIMEOUT);

        let err = ApiError::from(UpstreamError::ApiError {
            status: 403,
            message: "forbidden".into(),
        });
        assert_eq!(err.status_and_code(), (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"));
    }

    #[test]
    fn test_error_response_shape() {
        let response = ApiError::Validation("queries cannot be empty".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
