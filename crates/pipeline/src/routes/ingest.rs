//! Ingestion trigger.

use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;

use crate::db::CustomerStore;
use crate::error::AppError;
use crate::ingest::CommitCoordinator;
use crate::state::AppState;

/// Build the ingestion router.
pub fn router<S: CustomerStore + 'static>() -> Router<AppState<S>> {
    Router::new().route("/api/ingest", post(ingest::<S>))
}

/// Response for a successful ingestion run.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub records_processed: u64,
}

/// Run one full ingestion: fetch every upstream page, reconcile, commit once.
///
/// The run is spawned as its own task, so a client that disconnects or times
/// out does not cancel it; it still commits or rolls back.
///
/// # Errors
///
/// Returns `AppError::Ingest` if the run failed and was rolled back, and
/// `AppError::Task` if the run's task panicked.
pub async fn ingest<S: CustomerStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<IngestResponse>, AppError> {
    let run = tokio::spawn(async move {
        CommitCoordinator::new(state.fetcher(), state.ingest_config())
            .run(state.store())
            .await
    });
    let stats = run.await??;

    Ok(Json(IngestResponse {
        status: "success",
        records_processed: stats.records_processed,
    }))
}
