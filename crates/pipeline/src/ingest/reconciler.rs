//! Reconciler: turns incoming records into inserts and updates.
//!
//! Each record is handled inside its own checkpoint on the run's session. A
//! record that fails is rolled back to that checkpoint, logged and skipped;
//! the run carries on with the next one.

use serde::Serialize;

use customer_sync_core::{CustomerRecord, IncomingRecord, Page, StoredCustomer};

use super::error::RecordError;
use crate::db::CustomerSession;

/// What happened to one incoming record.
#[derive(Debug)]
pub enum Outcome {
    /// No row existed; one was staged.
    Inserted,
    /// A row existed and was merged. `changed` is false when every supplied
    /// field already matched, in which case nothing was written.
    Updated { changed: bool },
    /// The record was logged and left out of the run.
    Skipped(RecordError),
}

/// Tallies for one ingestion run.
///
/// `records_processed` counts every record received, including skipped ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub records_processed: u64,
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub pages: u32,
}

impl RunStats {
    fn record(&mut self, outcome: &Outcome) {
        self.records_processed += 1;
        match outcome {
            Outcome::Inserted => self.inserted += 1,
            Outcome::Updated { changed: true } => self.updated += 1,
            Outcome::Updated { changed: false } => self.unchanged += 1,
            Outcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Applies records to a session and keeps the run's tallies.
#[derive(Debug, Default)]
pub struct Reconciler {
    stats: RunStats,
}

impl Reconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile every record of a page, in upstream order.
    pub async fn reconcile_page<S: CustomerSession>(&mut self, page: &Page, session: &mut S) {
        for incoming in &page.records {
            let outcome = match incoming {
                IncomingRecord::Decoded(record) => self.reconcile(record, session).await,
                IncomingRecord::Malformed {
                    customer_id,
                    reason,
                } => {
                    tracing::error!(
                        customer_id = customer_id.as_deref().unwrap_or("<none>"),
                        page = page.page,
                        "Skipping malformed record: {reason}"
                    );
                    let outcome = Outcome::Skipped(RecordError::Malformed(reason.clone()));
                    self.stats.record(&outcome);
                    outcome
                }
            };
            tracing::trace!(?outcome, "Record reconciled");
        }
        self.stats.pages += 1;
    }

    /// Reconcile one record against the session and count it.
    ///
    /// Never fails: errors become [`Outcome::Skipped`] after the record's
    /// writes are rolled back to its checkpoint.
    pub async fn reconcile<S: CustomerSession>(
        &mut self,
        record: &CustomerRecord,
        session: &mut S,
    ) -> Outcome {
        let outcome = match apply_isolated(record, session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    customer_id = %record.customer_id,
                    error = %e,
                    "Error processing customer record"
                );
                Outcome::Skipped(e)
            }
        };
        self.stats.record(&outcome);
        outcome
    }

    #[must_use]
    pub const fn stats(&self) -> &RunStats {
        &self.stats
    }

    #[must_use]
    pub const fn into_stats(self) -> RunStats {
        self.stats
    }
}

/// Run [`apply`] between a checkpoint and its release, restoring the
/// checkpoint if anything fails, the release included.
async fn apply_isolated<S: CustomerSession>(
    record: &CustomerRecord,
    session: &mut S,
) -> Result<Outcome, RecordError> {
    session.checkpoint().await?;

    let result = match apply(record, session).await {
        Ok(outcome) => session
            .release_checkpoint()
            .await
            .map(|()| outcome)
            .map_err(RecordError::from),
        Err(e) => Err(e),
    };

    if result.is_err()
        && let Err(restore_err) = session.restore_checkpoint().await
    {
        tracing::warn!(
            customer_id = %record.customer_id,
            error = %restore_err,
            "Failed to restore checkpoint after record error"
        );
    }
    result
}

async fn apply<S: CustomerSession>(
    record: &CustomerRecord,
    session: &mut S,
) -> Result<Outcome, RecordError> {
    match session.find(&record.customer_id).await? {
        Some(mut existing) => {
            tracing::debug!(customer_id = %record.customer_id, "Updating existing customer");
            let changed = existing.merge(record);
            if changed {
                session.update(&existing).await?;
            }
            Ok(Outcome::Updated { changed })
        }
        None => {
            tracing::debug!(customer_id = %record.customer_id, "Inserting new customer");
            let customer = StoredCustomer::from_record(record);
            session.insert(&customer).await?;
            Ok(Outcome::Inserted)
        }
    }
}
