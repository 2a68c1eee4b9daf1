//! In-memory pipe source for tests

use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;

use crate::frame::RawResponse;
use crate::upstream::{HealthReport, PipeInfo, PipeSource, UpstreamError};

/// Canned pipes:
///
/// - `metrics`: `ts`, `v` with a null in the second row
/// - `untimed`: `host`, `n`, no temporal column
/// - `hosts`: `ts`, `host` with repeated and null hosts
/// - `empty`: schema but no rows
/// - `down`: transport failure
/// - `panic`: panics inside the call
/// - anything else: response-level "not found" error
pub struct MockSource {
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    healthy: bool,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            healthy: true,
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Pipe calls received so far
    pub fn calls(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.calls.lock().unwrap().clone()
    }

    fn canned(pipe: &str) -> serde_json::Value {
        match pipe {
            "metrics" => json!({
                "meta": [{"name": "ts", "type": "DateTime"}, {"name": "v", "type": "Float64"}],
                "data": [
                    {"ts": "2024-01-15 10:00:00", "v": 5},
                    {"ts": "2024-01-15 11:00:00", "v": null}
                ],
                "rows": 2
            }),
            "untimed" => json!({
                "meta": [{"name": "host", "type": "String"}, {"name": "n", "type": "UInt64"}],
                "data": [{"host": "a", "n": 1}, {"host": "b", "n": 2}],
                "rows": 2
            }),
            "hosts" => json!({
                "meta": [{"name": "ts", "type": "DateTime"}, {"name": "host", "type": "LowCardinality(String)"}],
                "data": [
                    {"ts": "2024-01-15 10:00:00", "host": "a"},
                    {"ts": "2024-01-15 10:00:00", "host": "b"},
                    {"ts": "2024-01-15 11:00:00", "host": "a"},
                    {"ts": "2024-01-15 11:00:00", "host": null}
                ],
                "rows": 4
            }),
            "empty" => json!({
                "meta": [{"name": "ts", "type": "DateTime"}, {"name": "host", "type": "String"}],
                "data": [],
                "rows": 0
            }),
            other => json!({"error": format!("pipe '{}' not found", other)}),
        }
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipeSource for MockSource {
    async fn query_pipe(
        &self,
        pipe: &str,
        params: &[(String, String)],
    ) -> Result<RawResponse, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push((pipe.to_string(), params.to_vec()));

        match pipe {
            "down" => Err(UpstreamError::Unavailable("connection refused".into())),
            "panic" => panic!("upstream exploded"),
            _ => serde_json::from_value(Self::canned(pipe))
                .map_err(|e| UpstreamError::Decode(e.to_string())),
        }
    }

    async fn health_check(&self) -> HealthReport {
        if self.healthy {
            HealthReport::ok()
        } else {
            HealthReport::error("invalid token")
        }
    }

    async fn list_pipes(&self) -> Result<Vec<PipeInfo>, UpstreamError> {
        Ok(vec![
            PipeInfo {
                id: "t_1".into(),
                name: "metrics".into(),
            },
            PipeInfo {
                id: "t_2".into(),
                name: "hosts".into(),
            },
        ])
    }
}
