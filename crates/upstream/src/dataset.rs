//! The in-memory customer dataset served by the upstream.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use customer_sync_core::PageEnvelope;

/// Errors loading a dataset file.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// An immutable list of raw customer records, shared across handlers.
///
/// Records are kept as raw JSON and served back verbatim, so the upstream
/// never normalizes what the pipeline has to cope with.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Arc<Vec<Value>>,
}

impl Dataset {
    /// Wrap an existing list of records.
    #[must_use]
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    /// Read a JSON array of records from `path`.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError` if the file cannot be read or is not a JSON
    /// array.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: display.clone(),
            source,
        })?;
        let records: Vec<Value> = serde_json::from_str(&raw).map_err(|source| DatasetError::Json {
            path: display,
            source,
        })?;
        Ok(Self::new(records))
    }

    /// Like [`load`](Self::load), but logs the failure and serves an empty
    /// dataset instead.
    #[must_use]
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(dataset) => {
                tracing::info!(
                    path = %path.display(),
                    records = dataset.len(),
                    "Loaded customer dataset"
                );
                dataset
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load customer dataset; serving no records");
                Self::default()
            }
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One page of records. Pages past the end have empty `data`.
    ///
    /// `page` is 1-based; both arguments must be at least 1.
    #[must_use]
    pub fn page(&self, page: u32, limit: u32) -> PageEnvelope<Value> {
        let start = u64::from(page.saturating_sub(1)) * u64::from(limit);
        let start = usize::try_from(start).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);

        PageEnvelope {
            data: self.records.iter().skip(start).take(take).cloned().collect(),
            total: self.len() as u64,
            page,
            limit,
        }
    }

    /// Find the first record whose `customer_id` equals `id`.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Value> {
        self.records
            .iter()
            .find(|record| record.get("customer_id").and_then(Value::as_str) == Some(id))
    }
}
