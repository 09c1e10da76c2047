//! CLI command implementations.

pub mod customers;
pub mod ingest;
pub mod schema;

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use customer_sync_pipeline::config::{ConfigError, PipelineConfig};
use customer_sync_pipeline::db::{self, StoreError};
use customer_sync_pipeline::ingest::{FetchError, IngestError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store query failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Upstream client could not be built.
    #[error("Upstream client error: {0}")]
    Fetch(#[from] FetchError),

    /// The ingestion run failed and was rolled back.
    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    /// Output could not be encoded.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    /// The requested customer does not exist.
    #[error("Customer not found: {0}")]
    NotFound(String),
}

/// Load configuration and connect to the pipeline database.
async fn connect() -> Result<(PipelineConfig, PgPool), CliError> {
    let config = PipelineConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    Ok((config, pool))
}

/// Print a value as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}
