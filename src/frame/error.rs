//! Frame building error types

use thiserror::Error;

/// Errors raised while turning a result set into frames
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// The result set has no rows
    #[error("no data")]
    NoData,

    /// No time key configured and no temporal column in the result
    #[error("no time key")]
    NoTimeKey,

    /// The configured time key is not a column of the result
    #[error("time key '{0}' not found in response")]
    TimeKeyNotFound(String),

    /// The result cannot be shaped as a time series
    #[error("no time series data")]
    NoTimeSeries,

    /// A cell does not have the JSON shape its declared type implies
    #[error("column '{column}' row {row}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        row: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// A temporal cell could not be parsed
    #[error("column '{column}' row {row}: cannot parse timestamp '{value}'")]
    InvalidTimestamp {
        column: String,
        row: usize,
        value: String,
    },
}

impl FrameError {
    /// Whether this error comes from decoding a cell rather than from the data shape
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            FrameError::TypeMismatch { .. } | FrameError::InvalidTimestamp { .. }
        )
    }
}

/// Result type for frame operations
pub type FrameResult<T> = Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(FrameError::NoData.to_string(), "no data");
        assert_eq!(FrameError::NoTimeKey.to_string(), "no time key");

        let err = FrameError::TypeMismatch {
            column: "v".into(),
            row: 3,
            expected: "number",
            found: "string",
        };
        assert_eq!(err.to_string(), "column 'v' row 3: expected number, found string");
        assert!(err.is_parse_error());
        assert!(!FrameError::NoTimeSeries.is_parse_error());
    }
}
