//! Upstream pipes API
//!
//! - **Client**: REST client for pipe queries, health checks and pipe listing
//! - **PipeSource**: the seam the query executor talks to, so the executor
//!   can run against the real API or an in-memory source

mod client;

pub use client::{AuthMode, PipeClient, UpstreamConfig, UpstreamError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::frame::RawResponse;

/// Anything that can run a pipe and report its health
#[async_trait]
pub trait PipeSource: Send + Sync {
    /// Run a pipe with already-expanded parameters
    async fn query_pipe(
        &self,
        pipe: &str,
        params: &[(String, String)],
    ) -> Result<RawResponse, UpstreamError>;

    /// Check that the upstream API is reachable and accepts our credentials
    async fn health_check(&self) -> HealthReport;

    /// List pipes exposed as endpoints
    async fn list_pipes(&self) -> Result<Vec<PipeInfo>, UpstreamError>;
}

/// Health status of the upstream API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

/// Result of a health check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
}

impl HealthReport {
    pub fn ok() -> Self {
        Self {
            status: HealthStatus::Ok,
            message: "OK".to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}

/// A pipe exposed as a query endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipeInfo {
    pub id: String,
    pub name: String,
}
