//! # Pipeframe
//!
//! Connector for an analytics "pipes" HTTP API. Each query names a pipe,
//! carries parameters that may reference the requested time range, and gets
//! back typed data frames ready for charting.
//!
//! ## Modules
//!
//! - [`frame`]: Response-to-frame transformation (type classification, time
//!   key resolution, per-metric, wide and table shapes)
//! - [`upstream`]: REST client for the pipes API and the [`PipeSource`] seam
//! - [`query`]: Query model, time variable expansion and the executor
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pipeframe::query::{ExecutorOptions, PipeQuery, QueryExecutor};
//! use pipeframe::upstream::{PipeClient, UpstreamConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PipeClient::new(UpstreamConfig::new("https://api.tinybird.co", "p.token"))?;
//!     let executor = QueryExecutor::new(Arc::new(client), ExecutorOptions::default());
//!
//!     let query = PipeQuery::new("A", "requests_per_minute")
//!         .param("start", "${__from:date:seconds}")
//!         .param("end", "${__to:date:seconds}");
//!
//!     for frame in executor.execute(&query).await? {
//!         println!("{}: {} rows", frame.name, frame.row_count());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod frame;
pub mod logging;
pub mod query;
pub mod upstream;

// Re-export top-level types for convenience
pub use frame::{
    build_frames, ColumnMeta, Field, FieldValues, Frame, FrameError, FrameOptions, FrameResult,
    NullPolicy, OutputFormat, RawResponse, TypeKind,
};

pub use upstream::{
    AuthMode, HealthReport, HealthStatus, PipeClient, PipeInfo, PipeSource, UpstreamConfig,
    UpstreamError,
};

pub use query::{
    BatchResponse, DataResponse, ExecutorOptions, PipeQuery, QueryError, QueryExecutor,
    QueryResult, TimeRange,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{ApiConfig, Config, ConfigError, LoggingConfig, QueryConfig, UpstreamSection};
