//! Commit coordinator: one ingestion run, one transaction.
//!
//! The coordinator drives the page cursor, hands every batch to the
//! reconciler, and ends the run's session with exactly one `commit` (all pages
//! fetched) or one `rollback` (any fatal error). Readers never observe a
//! partially ingested run.

use tracing::instrument;
use uuid::Uuid;

use super::error::IngestError;
use super::fetcher::{PageCursor, PageSource};
use super::reconciler::{Reconciler, RunStats};
use crate::config::IngestConfig;
use crate::db::{CustomerSession, CustomerStore};

/// Runs ingestion from a page source into a customer store.
pub struct CommitCoordinator<'a, P> {
    source: &'a P,
    page_limit: u32,
    max_pages: u32,
}

impl<'a, P: PageSource> CommitCoordinator<'a, P> {
    /// Create a coordinator using the page size and page bound from `config`.
    #[must_use]
    pub const fn new(source: &'a P, config: &IngestConfig) -> Self {
        Self {
            source,
            page_limit: config.page_limit,
            max_pages: config.max_pages,
        }
    }

    /// Open a session on `store` and run ingestion in it.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Session` if the session cannot be opened, and
    /// otherwise whatever [`run_session`](Self::run_session) returns.
    pub async fn run<S: CustomerStore>(&self, store: &S) -> Result<RunStats, IngestError> {
        let session = store.begin().await.map_err(IngestError::Session)?;
        self.run_session(session).await
    }

    /// Fetch every page, reconcile every record, and commit once.
    ///
    /// On success every change is visible and the stats count every record
    /// received. On error nothing from this run is visible.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::UpstreamUnavailable` or
    /// `IngestError::PageLimitExceeded` after rolling back, and
    /// `IngestError::CommitFailure` if the final commit is rejected.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4()))]
    pub async fn run_session<C: CustomerSession>(
        &self,
        mut session: C,
    ) -> Result<RunStats, IngestError> {
        tracing::info!(
            page_limit = self.page_limit,
            max_pages = self.max_pages,
            "Starting data ingestion"
        );

        let mut cursor = PageCursor::new(self.source, self.page_limit, self.max_pages);
        let mut reconciler = Reconciler::new();

        loop {
            match cursor.next_batch().await {
                Ok(Some(page)) => {
                    tracing::info!(
                        page = page.page,
                        records = page.len(),
                        "Processing records from page"
                    );
                    reconciler.reconcile_page(&page, &mut session).await;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Critical error during ingestion; rolling back");
                    abandon(session).await;
                    return Err(e);
                }
            }
        }

        let stats = reconciler.into_stats();
        tracing::info!(
            records = stats.records_processed,
            "Committing all changes to database"
        );

        if let Err(e) = session.commit().await {
            tracing::error!(error = %e, "Commit failed; no changes from this run were applied");
            return Err(IngestError::CommitFailure(e));
        }

        tracing::info!(
            records_processed = stats.records_processed,
            inserted = stats.inserted,
            updated = stats.updated,
            unchanged = stats.unchanged,
            skipped = stats.skipped,
            pages = stats.pages,
            "Successfully committed ingestion run"
        );

        Ok(stats)
    }
}

async fn abandon<C: CustomerSession>(session: C) {
    if let Err(e) = session.rollback().await {
        tracing::error!(error = %e, "Rollback failed");
    }
}
