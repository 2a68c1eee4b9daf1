//! Pipes REST API client
//!
//! HTTP client for the upstream analytics API.
//!
//! - `GET {host}/v0/pipes/{pipe}.json?{params}` runs a pipe
//! - `GET {host}/v0/pipes/` doubles as health check
//! - `GET {host}/v0/pipes` lists pipes

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{HealthReport, PipeInfo, PipeSource};
use crate::frame::RawResponse;

/// Longest upstream body echoed back in an error message
const MAX_ERROR_BODY: usize = 512;

/// How the auth token is presented to the upstream API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// `Authorization: Bearer {token}` header
    #[default]
    Bearer,
    /// `token={token}` query parameter
    Query,
}

/// Configuration for the pipes client
#[derive(Clone)]
pub struct UpstreamConfig {
    /// Base URL of the API (e.g., "https://api.example.com")
    pub host: String,
    /// Auth token; never logged
    pub token: String,
    pub auth_mode: AuthMode,
    /// Request timeout in milliseconds; transport default when unset
    pub request_timeout_ms: Option<u64>,
}

impl UpstreamConfig {
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
            auth_mode: AuthMode::default(),
            request_timeout_ms: None,
        }
    }

    /// Builder method: set the auth mode
    pub fn auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    /// Builder method: set the request timeout
    pub fn request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = Some(timeout_ms);
        self
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .field("auth_mode", &self.auth_mode)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

/// Pipes REST API client
///
/// Owns the connection pool for the lifetime of the connector; idle
/// connections are closed when the client is dropped.
pub struct PipeClient {
    client: Client,
    config: UpstreamConfig,
    base_url: String,
}

impl PipeClient {
    /// Create a new client with the given configuration
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamError> {
        let base_url = config.host.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(UpstreamError::Config("host is required".into()));
        }
        if config.token.trim().is_empty() {
            return Err(UpstreamError::Config("token is required".into()));
        }

        let mut builder = Client::builder().user_agent(concat!("pipeframe/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout_ms) = config.request_timeout_ms {
            builder = builder.timeout(std::time::Duration::from_millis(timeout_ms));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    fn pipes_url(&self) -> String {
        format!("{}/v0/pipes", self.base_url)
    }

    fn pipe_url(&self, pipe: &str) -> String {
        format!("{}/v0/pipes/{}.json", self.base_url, urlencoding::encode(pipe))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.auth_mode {
            AuthMode::Bearer => request.bearer_auth(&self.config.token),
            AuthMode::Query => request.query(&[("token", self.config.token.as_str())]),
        }
    }

    /// Send a GET and return the status and body text
    async fn get(&self, request: RequestBuilder) -> Result<(StatusCode, String), UpstreamError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(UpstreamError::from_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(UpstreamError::from_transport)?;
        Ok((status, body))
    }
}

#[async_trait]
impl PipeSource for PipeClient {
    async fn query_pipe(
        &self,
        pipe: &str,
        params: &[(String, String)],
    ) -> Result<RawResponse, UpstreamError> {
        let url = self.pipe_url(pipe);
        tracing::debug!(pipe = %pipe, params = params.len(), "Querying pipe");

        let (status, body) = self.get(self.client.get(&url).query(params)).await?;

        match serde_json::from_str::<RawResponse>(&body) {
            // An error body is reported through the response's error field
            Ok(decoded) if status.is_success() || decoded.error_message().is_some() => Ok(decoded),
            Ok(_) => Err(UpstreamError::api(status, &body)),
            Err(_) if !status.is_success() => Err(UpstreamError::api(status, &body)),
            Err(e) => Err(UpstreamError::Decode(e.to_string())),
        }
    }

    async fn health_check(&self) -> HealthReport {
        let url = format!("{}/", self.pipes_url());

        let (_, body) = match self.get(self.client.get(&url)).await {
            Ok(result) => result,
            Err(e) => return HealthReport::error(e.to_string()),
        };

        #[derive(Deserialize)]
        struct HealthBody {
            #[serde(default)]
            error: Option<String>,
        }

        match serde_json::from_str::<HealthBody>(&body) {
            Ok(HealthBody { error: Some(error) }) if !error.is_empty() => HealthReport::error(error),
            Ok(_) => HealthReport::ok(),
            Err(e) => HealthReport::error(e.to_string()),
        }
    }

    async fn list_pipes(&self) -> Result<Vec<PipeInfo>, UpstreamError> {
        let (status, body) = self.get(self.client.get(self.pipes_url())).await?;
        if !status.is_success() {
            return Err(UpstreamError::api(status, &body));
        }

        let listing: PipeListing =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))?;

        Ok(listing
            .pipes
            .into_iter()
            .filter(|p| p.pipe_type.as_deref() == Some("endpoint"))
            .map(|p| PipeInfo {
                id: p.id,
                name: p.name,
            })
            .collect())
    }
}

// ============================================
// Response DTOs
// ============================================

#[derive(Debug, Deserialize)]
struct PipeListing {
    #[serde(default)]
    pipes: Vec<PipeEntry>,
}

#[derive(Debug, Deserialize)]
struct PipeEntry {
    #[serde(default)]
    id: String,
    name: String,
    #[serde(rename = "type", default)]
    pipe_type: Option<String>,
}

// ============================================
// Errors
// ============================================

/// Errors that can occur when talking to the upstream API
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Invalid upstream configuration: {0}")]
    Config(String),

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Request(e.without_url())
    }
}

impl UpstreamError {
    /// The request URL carries the token in query auth mode, so it is
    /// stripped before the error is stored or displayed.
    fn from_transport(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            UpstreamError::Timeout
        } else if e.is_connect() {
            UpstreamError::Unavailable(e.to_string())
        } else {
            UpstreamError::Request(e)
        }
    }

    fn api(status: StatusCode, body: &str) -> Self {
        let mut message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
        if message.is_empty() {
            message = status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string();
        }
        UpstreamError::ApiError {
            status: status.as_u16(),
            message,
        }
    }
}
