//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `PIPEFRAME_*` environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::frame::NullPolicy;
use crate::query::ExecutorOptions;
use crate::upstream::{AuthMode, UpstreamConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamSection,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream pipes API configuration
#[derive(Clone, Deserialize)]
pub struct UpstreamSection {
    #[serde(default = "default_upstream_host")]
    pub host: String,

    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub auth_mode: AuthMode,

    /// Unset means no timeout beyond the transport default
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_upstream_host() -> String {
    "https://api.tinybird.co".to_string()
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            host: default_upstream_host(),
            token: String::new(),
            auth_mode: AuthMode::default(),
            request_timeout_secs: None,
        }
    }
}

impl std::fmt::Debug for UpstreamSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamSection")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .field("auth_mode", &self.auth_mode)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl UpstreamSection {
    /// Client configuration for this section
    pub fn client_config(&self) -> UpstreamConfig {
        let config = UpstreamConfig::new(&self.host, &self.token).auth_mode(self.auth_mode);
        match self.request_timeout_secs {
            Some(secs) => config.request_timeout_ms(secs.saturating_mul(1000)),
            None => config,
        }
    }
}

/// Query execution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default)]
    pub strict_time_key: bool,

    #[serde(default)]
    pub null_policy: NullPolicy,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_queries: usize,
}

fn default_max_concurrent() -> usize {
    8
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            strict_time_key: false,
            null_policy: NullPolicy::default(),
            max_concurrent_queries: default_max_concurrent(),
        }
    }
}

impl QueryConfig {
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            strict_time_key: self.strict_time_key,
            null_policy: self.null_policy,
            max_concurrent_queries: self.max_concurrent_queries,
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("pipeframe").join("config.toml")),
            Some(PathBuf::from("/etc/pipeframe/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Upstream overrides
        if let Some(host) = lookup("PIPEFRAME_HOST") {
            self.upstream.host = host;
        }
        if let Some(token) = lookup("PIPEFRAME_TOKEN") {
            self.upstream.token = token;
        }
        if let Some(mode) = lookup("PIPEFRAME_AUTH_MODE") {
            match mode.trim().to_ascii_lowercase().as_str() {
                "bearer" => self.upstream.auth_mode = AuthMode::Bearer,
                "query" => self.upstream.auth_mode = AuthMode::Query,
                other => tracing::warn!("Ignoring unknown PIPEFRAME_AUTH_MODE '{}'", other),
            }
        }
        if let Some(timeout) = lookup("PIPEFRAME_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.upstream.request_timeout_secs = Some(secs);
            }
        }

        // Query overrides
        if let Some(strict) = lookup("PIPEFRAME_STRICT_TIME_KEY") {
            if let Ok(b) = strict.parse() {
                self.query.strict_time_key = b;
            }
        }
        if let Some(policy) = lookup("PIPEFRAME_NULL_POLICY") {
            match policy.trim().to_ascii_lowercase().as_str() {
                "zero" => self.query.null_policy = NullPolicy::Zero,
                "preserve" => self.query.null_policy = NullPolicy::Preserve,
                other => tracing::warn!("Ignoring unknown PIPEFRAME_NULL_POLICY '{}'", other),
            }
        }
        if let Some(max) = lookup("PIPEFRAME_MAX_CONCURRENT_QUERIES") {
            if let Ok(n) = max.parse() {
                self.query.max_concurrent_queries = n;
            }
        }

        // API overrides
        if let Some(host) = lookup("PIPEFRAME_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = lookup("PIPEFRAME_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = lookup("PIPEFRAME_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("PIPEFRAME_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Pipeframe Configuration
#
# Environment variables override these settings:
# - PIPEFRAME_HOST
# - PIPEFRAME_TOKEN
# - PIPEFRAME_AUTH_MODE
# - PIPEFRAME_REQUEST_TIMEOUT_SECS
# - PIPEFRAME_STRICT_TIME_KEY
# - PIPEFRAME_NULL_POLICY
# - PIPEFRAME_MAX_CONCURRENT_QUERIES
# - PIPEFRAME_API_HOST
# - PIPEFRAME_API_PORT
# - PIPEFRAME_LOG_LEVEL
# - PIPEFRAME_LOG_FORMAT

[upstream]
# Base URL of the pipes API
host = "https://api.tinybird.co"

# Auth token (prefer PIPEFRAME_TOKEN over storing it here)
token = ""

# How the token is sent: bearer (Authorization header) or query (token=...)
auth_mode = "bearer"

# Request timeout in seconds; leave unset for no timeout
# request_timeout_secs = 30

[query]
# Require an explicit time key on every query
strict_time_key = false

# Null cells: zero (0, empty string, epoch) or preserve (keep as null)
null_policy = "zero"

# Queries of one batch running at the same time
max_concurrent_queries = 8

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins; empty allows any
cors_origins = []

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.upstream.host, "https://api.tinybird.co");
        assert_eq!(config.upstream.auth_mode, AuthMode::Bearer);
        assert_eq!(config.query.max_concurrent_queries, 8);
        assert_eq!(config.query.null_policy, NullPolicy::Zero);
        assert_eq!(config.api.port, 8090);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.upstream.request_timeout_secs, None);
        assert!(!config.query.strict_time_key);
        assert!(config.api.cors_origins.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[upstream]
host = "http://localhost:8001"
token = "p.secret"
auth_mode = "query"
request_timeout_secs = 5

[query]
strict_time_key = true
null_policy = "preserve"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.upstream.host, "http://localhost:8001");
        assert_eq!(config.upstream.auth_mode, AuthMode::Query);
        assert!(config.query.strict_time_key);
        assert_eq!(config.query.null_policy, NullPolicy::Preserve);
        assert_eq!(config.query.max_concurrent_queries, 8);

        let client = config.upstream.client_config();
        assert_eq!(client.request_timeout_ms, Some(5000));
        assert_eq!(client.auth_mode, AuthMode::Query);

        let options = config.query.executor_options();
        assert!(options.strict_time_key);
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/nonexistent/pipeframe.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[query]\nmax_concurrent_queries = \"many\"").unwrap();
        let invalid = Config::load(file.path()).unwrap_err();
        assert!(matches!(invalid, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("PIPEFRAME_HOST", "http://upstream:9000"),
            ("PIPEFRAME_TOKEN", "p.env"),
            ("PIPEFRAME_AUTH_MODE", "QUERY"),
            ("PIPEFRAME_NULL_POLICY", "preserve"),
            ("PIPEFRAME_MAX_CONCURRENT_QUERIES", "not-a-number"),
            ("PIPEFRAME_API_PORT", "9999"),
            ("PIPEFRAME_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.upstream.host, "http://upstream:9000");
        assert_eq!(config.upstream.token, "p.env");
        assert_eq!(config.upstream.auth_mode, AuthMode::Query);
        assert_eq!(config.query.null_policy, NullPolicy::Preserve);
        assert_eq!(config.query.max_concurrent_queries, 8);
        assert_eq!(config.api.port, 9999);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = Config::default();
        config.upstream.token = "p.very-secret".into();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
