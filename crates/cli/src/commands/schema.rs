//! Schema command.
//!
//! # Usage
//!
//! ```bash
//! cs-cli schema
//! ```

use customer_sync_pipeline::db;

use super::{CliError, connect};

/// Create the `customers` table if it does not exist.
///
/// # Errors
///
/// Returns `CliError` if configuration is invalid or the DDL fails.
pub async fn create() -> Result<(), CliError> {
    let (_, pool) = connect().await?;

    tracing::info!("Creating customers table...");
    db::ensure_schema(&pool).await?;

    tracing::info!("Schema ready");
    Ok(())
}
