//! Error taxonomy for ingestion runs.
//!
//! Per-record errors ([`RecordError`]) are recovered inside the reconciler and
//! never escalate. Everything in [`IngestError`] is fatal to the run and
//! triggers a rollback.

use std::time::Duration;

use thiserror::Error;

use crate::db::StoreError;

/// Errors fetching one page from the upstream source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the connection failed.
    #[error("request for page {page} failed: {source}")]
    Request {
        page: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the fetch timeout.
    #[error("request for page {page} timed out after {}s", .timeout.as_secs())]
    Timeout { page: u32, timeout: Duration },

    /// The upstream answered with a non-success status.
    #[error("upstream returned HTTP {status} for page {page}")]
    Status { page: u32, status: u16 },

    /// The body was not a `{data, total, page, limit}` envelope.
    #[error("invalid response body for page {page}: {message}")]
    InvalidBody { page: u32, message: String },

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),
}

/// Errors reconciling a single record. Logged and skipped, never fatal.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The upstream element did not decode into a customer record.
    #[error("malformed record: {0}")]
    Malformed(String),

    /// The store failed while reading or writing this record.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A page could not be fetched.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] FetchError),

    /// The upstream kept returning non-empty pages past the configured bound.
    #[error("upstream returned more than {max_pages} non-empty pages")]
    PageLimitExceeded { max_pages: u32 },

    /// The store rejected the final commit.
    #[error("commit failed: {0}")]
    CommitFailure(#[source] StoreError),

    /// The run's session could not be opened.
    #[error("could not open store session: {0}")]
    Session(#[source] StoreError),
}
