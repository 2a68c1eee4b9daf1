//! Query orchestration
//!
//! Turns inbound query descriptions into frames:
//!
//! - **Model**: the query, its time range and the per-query result
//! - **Variables**: time placeholder expansion in pipe parameters
//! - **Executor**: validation, the pipe call and frame assembly, one query
//!   or a concurrent batch
//!
//! # Example
//!
//! ```rust,ignore
//! use pipeframe::query::{ExecutorOptions, PipeQuery, QueryExecutor};
//!
//! let executor = QueryExecutor::new(source, ExecutorOptions::default());
//! let query = PipeQuery::new("A", "sales_by_hour")
//!     .param("start", "${__from:date:seconds}")
//!     .time_key("hour");
//!
//! let frames = executor.execute(&query).await?;
//! ```

mod error;
mod executor;
mod model;
mod variables;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{QueryError, QueryResult, BAD_REQUEST};
pub use executor::{ExecutorOptions, QueryExecutor};
pub use model::{BatchResponse, DataResponse, ErrorInfo, PipeQuery, TimeRange};
pub use variables::{expand, expand_params, FROM_MARKER, TO_MARKER};
