//! Ingestion engine.
//!
//! A run pulls every page from the upstream source ([`fetcher`]), reconciles
//! each record into the run's store session ([`reconciler`]) and commits once
//! at the end ([`coordinator`]).
//!
//! ```text
//! PageCursor ──▶ Reconciler ──▶ CustomerSession ──▶ commit | rollback
//! ```

pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod reconciler;

pub use coordinator::CommitCoordinator;
pub use error::{FetchError, IngestError, RecordError};
pub use fetcher::{HttpPageFetcher, PageCursor, PageSource};
pub use reconciler::{Outcome, Reconciler, RunStats};
