//! Query error types
//!
//! Every failure of a single query ends up as one of these. Each variant has
//! its own machine-readable code; all of them are reported to the host as a
//! bad request.

use thiserror::Error;

use crate::frame::FrameError;
use crate::upstream::UpstreamError;

/// Status reported to the host for every failed query
pub const BAD_REQUEST: u16 = 400;

/// Errors that can occur while running a query
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The query itself is invalid (missing pipe name, bad time variable, ...)
    #[error("{0}")]
    Validation(String),

    /// The upstream call could not be made or completed
    #[error("{0}")]
    Transport(String),

    /// The upstream API reported an error
    #[error("{0}")]
    Upstream(String),

    /// The result cannot be shaped into frames
    #[error("{0}")]
    Data(String),

    /// The inbound query, the response or one of its cells could not be decoded
    #[error("{0}")]
    Parse(String),

    /// Unexpected fault while processing the query
    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Validation(_) => "VALIDATION_ERROR",
            QueryError::Transport(_) => "TRANSPORT_ERROR",
            QueryError::Upstream(_) => "UPSTREAM_ERROR",
            QueryError::Data(_) => "DATA_ERROR",
            QueryError::Parse(_) => "PARSE_ERROR",
            QueryError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Status reported to the host
    pub fn status(&self) -> u16 {
        BAD_REQUEST
    }
}

impl From<FrameError> for QueryError {
    fn from(err: FrameError) -> Self {
        if err.is_parse_error() {
            QueryError::Parse(err.to_string())
        } else {
            QueryError::Data(err.to_string())
        }
    }
}

impl From<UpstreamError> for QueryError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Config(_) => QueryError::Validation(err.to_string()),
            UpstreamError::ApiError { .. } => QueryError::Upstream(err.to_string()),
            UpstreamError::Decode(_) => QueryError::Parse(err.to_string()),
            UpstreamError::Unavailable(_) | UpstreamError::Timeout | UpstreamError::Request(_) => {
                QueryError::Transport(err.to_string())
            }
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
