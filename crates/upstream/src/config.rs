//! Upstream server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `UPSTREAM_HOST` - Bind address (default: 0.0.0.0)
//! - `UPSTREAM_PORT` - Listen port (default: 5000)
//! - `UPSTREAM_DATA_PATH` - JSON array of customer records
//!   (default: `crates/upstream/data/customers.json`)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_DATA_PATH: &str = "crates/upstream/data/customers.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Upstream server configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Path of the dataset file
    pub data_path: PathBuf,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
}

impl UpstreamConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the host or port does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("UPSTREAM_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("UPSTREAM_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("UPSTREAM_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("UPSTREAM_PORT".to_string(), e.to_string()))?;
        let data_path = PathBuf::from(get_env_or_default("UPSTREAM_DATA_PATH", DEFAULT_DATA_PATH));
        let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

        Ok(Self {
            host,
            port,
            data_path,
            json_logs,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
