//! Query Executor
//!
//! Drives one query end-to-end and runs batches of queries.
//!
//! # Execution Pipeline
//!
//! ```text
//! Parse → Validate → Expand params → Pipe call → Response error check → Build frames
//! ```
//!
//! Each query in a batch runs in its own task. A fault in one task becomes an
//! error result for that query only; sibling queries are unaffected.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::frame::{build_frames, Frame, NullPolicy, RawResponse, RawValue};
use crate::query::error::{QueryError, QueryResult};
use crate::query::model::{BatchResponse, DataResponse, PipeQuery};
use crate::query::variables::expand_params;
use crate::upstream::PipeSource;

/// Executor behaviour settings
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Reject queries without an explicit time key
    pub strict_time_key: bool,
    pub null_policy: NullPolicy,
    /// Upper bound on queries of one batch running at the same time
    pub max_concurrent_queries: usize,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            strict_time_key: false,
            null_policy: NullPolicy::Zero,
            max_concurrent_queries: 8,
        }
    }
}

/// Query executor
#[derive(Clone)]
pub struct QueryExecutor {
    source: Arc<dyn PipeSource>,
    options: Arc<ExecutorOptions>,
    limiter: Arc<Semaphore>,
}

impl QueryExecutor {
    /// Create a new query executor
    pub fn new(source: Arc<dyn PipeSource>, options: ExecutorOptions) -> Self {
        let permits = options.max_concurrent_queries.max(1);
        Self {
            source,
            options: Arc::new(options),
            limiter: Arc::new(Semaphore::new(permits)),
        }
    }

    /// The upstream source queries run against
    pub fn source(&self) -> &Arc<dyn PipeSource> {
        &self.source
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Check the query before anything is sent upstream
    pub fn validate(&self, query: &PipeQuery) -> QueryResult<()> {
        if query.pipe_name.trim().is_empty() {
            return Err(QueryError::Validation("pipe name is required".into()));
        }

        if self.options.strict_time_key && query.explicit_time_key().is_none() {
            return Err(QueryError::Validation("time key is required".into()));
        }

        Ok(())
    }

    /// Run the pipe for a query and check the response-level error
    pub async fn fetch(&self, query: &PipeQuery) -> QueryResult<RawResponse> {
        self.validate(query)?;

        let params = expand_params(&query.params, &query.time_range)?;
        let response = self
            .source
            .query_pipe(query.pipe_name.trim(), &params)
            .await?;

        if let Some(error) = response.error_message() {
            return Err(QueryError::Upstream(error.to_string()));
        }

        Ok(response)
    }

    /// Execute a parsed query
    pub async fn execute(&self, query: &PipeQuery) -> QueryResult<Vec<Frame>> {
        let start = Instant::now();
        tracing::info!(ref_id = %query.ref_id, pipe = %query.pipe_name, "Query started");

        let response = self.fetch(query).await?;
        let options = query.frame_options(self.options.null_policy);
        let frames = build_frames(&response, &options)?;

        tracing::info!(
            ref_id = %query.ref_id,
            pipe = %query.pipe_name,
            format = %query.format,
            rows = response.data.len(),
            frames = frames.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query completed"
        );

        Ok(frames)
    }

    /// Parse and execute one query, folding any failure into the response
    pub async fn execute_value(&self, value: serde_json::Value) -> DataResponse {
        let result = match PipeQuery::parse(value) {
            Ok(query) => self.execute(&query).await,
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            tracing::warn!(code = e.code(), error = %e, "Query failed");
        }

        result.into()
    }

    /// Execute a batch of queries.
    ///
    /// Queries run concurrently, bounded by `max_concurrent_queries`. Results
    /// are keyed by `refId`; a query without one is keyed by its position.
    pub async fn execute_batch(&self, queries: Vec<serde_json::Value>) -> BatchResponse {
        let mut handles = Vec::with_capacity(queries.len());

        for (index, value) in queries.into_iter().enumerate() {
            let ref_id = ref_id_of(&value, index);
            let executor = self.clone();

            let handle = tokio::spawn(async move {
                let _permit = executor.limiter.clone().acquire_owned().await.ok();
                executor.execute_value(value).await
            });
            handles.push((ref_id, handle));
        }

        let mut results = BatchResponse::new();
        for (ref_id, handle) in handles {
            let response = match handle.await {
                Ok(response) => response,
                Err(e) => {
                    let message = if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        e.to_string()
                    };
                    tracing::error!(ref_id = %ref_id, error = %message, "Query task aborted");
                    DataResponse::error(&QueryError::Internal(message))
                }
            };

            if results.insert(ref_id.clone(), response).is_some() {
                tracing::warn!(ref_id = %ref_id, "Duplicate refId in batch, keeping the last result");
            }
        }

        results
    }

    /// Distinct values of the query's variable key, in first-seen order
    pub async fn variable_values(&self, query: &PipeQuery) -> QueryResult<Vec<String>> {
        let key = query
            .variable_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| QueryError::Validation("variable key is required".into()))?;

        let response = self.fetch(query).await?;
        if response.data.is_empty() {
            return Ok(Vec::new());
        }

        let in_schema = response.column(key).is_some()
            || response.data.first().is_some_and(|row| row.contains_key(key));
        if !in_schema {
            return Err(QueryError::Data(format!(
                "variable key '{}' is not part of data schema",
                key
            )));
        }

        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for row in &response.data {
            let text = match row.get(key) {
                Some(RawValue::String(s)) => s.clone(),
                Some(RawValue::Number(n)) => n.to_string(),
                Some(RawValue::Other(v)) => v.to_string(),
                Some(RawValue::Null) | None => continue,
            };
            if seen.insert(text.clone()) {
                values.push(text);
            }
        }

        Ok(values)
    }
}

fn ref_id_of(value: &serde_json::Value, index: usize) -> String {
    value
        .get("refId")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", index))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "query task panicked".to_string()
    }
}
