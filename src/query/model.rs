//! Query request and response model
//!
//! A [`PipeQuery`] is parsed fresh from each incoming query; a
//! [`DataResponse`] carries either its frames or a structured error.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::{QueryError, QueryResult};
use crate::frame::{Frame, FrameOptions, NullPolicy, OutputFormat};

/// Default look-back when a query carries no time range
const DEFAULT_RANGE_HOURS: i64 = 6;

/// Requested time range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// The last `hours` hours up to now
    pub fn last_hours(hours: i64) -> Self {
        let to = Utc::now();
        Self {
            from: to - Duration::hours(hours),
            to,
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::last_hours(DEFAULT_RANGE_HOURS)
    }
}

/// A single query against a pipe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipeQuery {
    /// Identifier the host uses to match results to queries
    #[serde(default)]
    pub ref_id: String,
    #[serde(default)]
    pub pipe_name: String,
    /// Pipe parameters; values may contain time placeholders
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub time_key: Option<String>,
    #[serde(default)]
    pub format: OutputFormat,
    /// Comma-separated value columns
    #[serde(default)]
    pub data_keys: String,
    /// Comma-separated label columns
    #[serde(default)]
    pub label_keys: String,
    /// Column whose values feed a template variable
    #[serde(default)]
    pub variable_key: Option<String>,
    #[serde(default)]
    pub time_range: TimeRange,
}

impl PipeQuery {
    /// Create a query for a pipe
    pub fn new(ref_id: impl Into<String>, pipe_name: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            pipe_name: pipe_name.into(),
            ..Default::default()
        }
    }

    /// Parse a query from its JSON form
    pub fn parse(value: serde_json::Value) -> QueryResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| QueryError::Parse(format!("invalid query: {}", e)))
    }

    /// Builder method: add a parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Builder method: set the explicit time key
    pub fn time_key(mut self, key: impl Into<String>) -> Self {
        self.time_key = Some(key.into());
        self
    }

    /// Builder method: set the output format
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Builder method: set the time range
    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = range;
        self
    }

    /// Builder method: set the variable key
    pub fn variable_key(mut self, key: impl Into<String>) -> Self {
        self.variable_key = Some(key.into());
        self
    }

    /// The explicit time key, if one is set and non-blank
    pub fn explicit_time_key(&self) -> Option<&str> {
        self.time_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Frame assembly options for this query
    pub fn frame_options(&self, null_policy: NullPolicy) -> FrameOptions {
        FrameOptions {
            format: self.format,
            time_key: self.explicit_time_key().map(str::to_string),
            data_keys: split_keys(&self.data_keys),
            label_keys: split_keys(&self.label_keys),
            null_policy,
        }
    }
}

fn split_keys(keys: &str) -> Vec<String> {
    keys.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Structured error reported for a failed query
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub status: u16,
}

impl From<&QueryError> for ErrorInfo {
    fn from(err: &QueryError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            status: err.status(),
        }
    }
}

/// Result of one query: frames on success, an error otherwise, never both
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DataResponse {
    pub frames: Vec<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl DataResponse {
    pub fn frames(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            error: None,
        }
    }

    pub fn error(err: &QueryError) -> Self {
        Self {
            frames: Vec::new(),
            error: Some(err.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<QueryResult<Vec<Frame>>> for DataResponse {
    fn from(result: QueryResult<Vec<Frame>>) -> Self {
        match result {
            Ok(frames) => DataResponse::frames(frames),
            Err(err) => DataResponse::error(&err),
        }
    }
}

/// Results of a batch, keyed by ref id
pub type BatchResponse = BTreeMap<String, DataResponse>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query() {
        let query = PipeQuery::parse(json!({
            "refId": "A",
            "pipeName": "sales",
            "params": {"start": "${__from:date}"},
            "timeKey": "ts",
            "format": "wide",
            "dataKeys": "a, b,",
            "timeRange": {"from": "2024-01-01T00:00:00Z", "to": "2024-01-02T00:00:00Z"},
            "somethingElse": 42
        }))
        .unwrap();

        assert_eq!(query.ref_id, "A");
        assert_eq!(query.pipe_name, "sales");
        assert_eq!(query.format, OutputFormat::Wide);
        assert_eq!(query.explicit_time_key(), Some("ts"));
        assert_eq!(query.time_range.from.to_rfc3339(), "2024-01-01T00:00:00+00:00");

        let options = query.frame_options(NullPolicy::Zero);
        assert_eq!(options.data_keys, vec!["a", "b"]);
        assert!(options.label_keys.is_empty());
    }

    #[test]
    fn test_defaults() {
        let query = PipeQuery::parse(json!({"pipeName": "p"})).unwrap();
        assert_eq!(query.format, OutputFormat::TimeSeries);
        assert!(query.params.is_empty());
        assert!(query.time_range.from < query.time_range.to);
    }

    #[test]
    fn test_blank_time_key_is_absent() {
        let query = PipeQuery::new("A", "p").time_key("  ");
        assert_eq!(query.explicit_time_key(), None);
    }

    #[test]
    fn test_malformed_query() {
        let err = PipeQuery::parse(json!({"pipeName": 7})).unwrap_err();
        assert_eq!(err.code(), "PARSE_ERROR");
        assert!(err.to_string().starts_with("invalid query:"));
    }

    #[test]
    fn test_error_response_has_no_frames() {
        let result: QueryResult<Vec<Frame>> = Err(QueryError::Data("no data".into()));
        let response = DataResponse::from(result);
        assert!(response.is_error());
        assert!(response.frames.is_empty());

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["error"]["code"], "DATA_ERROR");
        assert_eq!(body["error"]["status"], 400);
    }
}
