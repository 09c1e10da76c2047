//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::IngestConfig;
use crate::db::CustomerStore;
use crate::ingest::{FetchError, HttpPageFetcher};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. It is generic over the
/// customer store so the same router serves `PostgreSQL` in production and the
/// in-memory store in tests.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    ingest: IngestConfig,
    store: S,
    fetcher: HttpPageFetcher,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: CustomerStore> AppState<S> {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Client` if the upstream HTTP client cannot be built.
    pub fn new(ingest: IngestConfig, store: S) -> Result<Self, FetchError> {
        let fetcher = HttpPageFetcher::new(&ingest)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                ingest,
                store,
                fetcher,
            }),
        })
    }

    /// Get a reference to the ingestion settings.
    #[must_use]
    pub fn ingest_config(&self) -> &IngestConfig {
        &self.inner.ingest
    }

    /// Get a reference to the customer store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get a reference to the upstream page fetcher.
    #[must_use]
    pub fn fetcher(&self) -> &HttpPageFetcher {
        &self.inner.fetcher
    }
}
