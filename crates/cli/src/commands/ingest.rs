//! One-shot ingestion command.
//!
//! # Usage
//!
//! ```bash
//! UPSTREAM_URL=http://localhost:5000 cs-cli ingest
//! ```
//!
//! Prints the run's stats as JSON on success. On failure nothing from the run
//! is committed and the command exits non-zero.

use customer_sync_pipeline::db::{self, PgCustomerStore};
use customer_sync_pipeline::ingest::{CommitCoordinator, HttpPageFetcher};

use super::{CliError, connect, print_json};

/// Run one full ingestion against the configured database.
///
/// # Errors
///
/// Returns `CliError::Ingest` if the run was rolled back, or another
/// `CliError` if setup fails.
pub async fn run() -> Result<(), CliError> {
    let (config, pool) = connect().await?;
    db::ensure_schema(&pool).await?;

    let fetcher = HttpPageFetcher::new(&config.ingest)?;
    let store = PgCustomerStore::new(pool);

    tracing::info!(upstream = %fetcher.endpoint(), "Starting ingestion");
    let stats = CommitCoordinator::new(&fetcher, &config.ingest)
        .run(&store)
        .await?;

    print_json(&stats)
}
