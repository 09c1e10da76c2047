//! Pipeline configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `PIPELINE_HOST` - Bind address (default: 0.0.0.0)
//! - `PIPELINE_PORT` - Listen port (default: 8000)
//! - `UPSTREAM_URL` - Base URL of the upstream customer source; falls back to
//!   `MOCK_SERVER_URL`, then to `http://mock:5000`
//! - `INGEST_PAGE_LIMIT` - Records requested per upstream page (default: 10)
//! - `INGEST_FETCH_TIMEOUT_SECS` - Timeout for each page request (default: 10)
//! - `INGEST_MAX_PAGES` - Non-empty pages a single run may ingest before it is
//!   aborted (default: 10000)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_UPSTREAM_URL: &str = "http://mock:5000";
const DEFAULT_PAGE_LIMIT: u32 = 10;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_PAGES: u32 = 10_000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Pipeline service configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Ingestion run settings
    pub ingest: IngestConfig,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Settings for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Base URL of the upstream source; the list endpoint is `{base}/api/customers`.
    pub upstream_url: Url,
    /// Records requested per page.
    pub page_limit: u32,
    /// Timeout applied to every page request.
    pub fetch_timeout: Duration,
    /// Upper bound on non-empty pages ingested by one run.
    pub max_pages: u32,
}

impl IngestConfig {
    /// Settings with defaults for everything but the upstream URL.
    #[must_use]
    pub const fn new(upstream_url: Url) -> Self {
        Self {
            upstream_url,
            page_limit: DEFAULT_PAGE_LIMIT,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Load ingestion settings from environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the upstream URL does not parse
    /// or a numeric setting is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_optional_env("UPSTREAM_URL")
            .or_else(|| get_optional_env("MOCK_SERVER_URL"))
            .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        let upstream_url = parse_upstream_url(&raw_url)?;

        let page_limit = get_positive("INGEST_PAGE_LIMIT", DEFAULT_PAGE_LIMIT)?;
        let fetch_timeout_secs =
            get_positive("INGEST_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?;
        let max_pages = get_positive("INGEST_MAX_PAGES", DEFAULT_MAX_PAGES)?;

        Ok(Self {
            upstream_url,
            page_limit,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            max_pages,
        })
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = get_env_or_default("PIPELINE_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("PIPELINE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PIPELINE_PORT", "8000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PIPELINE_PORT".to_string(), e.to_string()))?;
        let ingest = IngestConfig::from_env()?;
        let json_logs = get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            ingest,
            json_logs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a positive integer setting, falling back to `default` when unset.
fn get_positive<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + From<u8>,
    T::Err: std::fmt::Display,
{
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    parse_positive(key, &raw)
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + From<u8>,
    T::Err: std::fmt::Display,
{
    let value = raw
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if value == T::from(0) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(value)
}

/// Parse the upstream base URL, requiring an http(s) scheme.
fn parse_upstream_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("UPSTREAM_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "UPSTREAM_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}
