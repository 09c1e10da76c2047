//! Pagination envelope and ingestion-time pages.

use serde::{Deserialize, Serialize};

use super::customer::CustomerRecord;

/// The `{data, total, page, limit}` body used by paginated list endpoints.
///
/// Shared by the upstream source (where `T` is a raw JSON record) and the
/// local customer API (where `T` is a stored customer). Missing members
/// decode as their defaults; an envelope without `data` reads as an empty
/// page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
}

/// One element of an upstream page, decoded on its own.
///
/// A malformed element does not invalidate the rest of its page; it is
/// carried through so the reconciler can count and log it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingRecord {
    /// The element decoded into a customer record.
    Decoded(CustomerRecord),
    /// The element could not be decoded.
    Malformed {
        /// The raw `customer_id`, if the element had a string one.
        customer_id: Option<String>,
        /// Why decoding failed.
        reason: String,
    },
}

impl IncomingRecord {
    /// Decode a single raw JSON element.
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Self {
        let customer_id = value
            .get("customer_id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        match serde_json::from_value::<CustomerRecord>(value) {
            Ok(record) => Self::Decoded(record),
            Err(e) => Self::Malformed {
                customer_id,
                reason: e.to_string(),
            },
        }
    }

    /// The customer id for log lines, decoded or raw.
    #[must_use]
    pub fn customer_id(&self) -> Option<&str> {
        match self {
            Self::Decoded(record) => Some(record.customer_id.as_str()),
            Self::Malformed { customer_id, .. } => customer_id.as_deref(),
        }
    }
}

/// A batch of incoming records plus the cursor that produced it.
///
/// Owned by the fetch loop for one iteration and dropped after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number requested.
    pub page: u32,
    /// Page size requested.
    pub limit: u32,
    /// Records in upstream order.
    pub records: Vec<IncomingRecord>,
}

impl Page {
    /// Build a page by decoding each raw element independently.
    #[must_use]
    pub fn from_values(page: u32, limit: u32, values: Vec<serde_json::Value>) -> Self {
        Self {
            page,
            limit,
            records: values.into_iter().map(IncomingRecord::from_value).collect(),
        }
    }

    /// An empty page is the end-of-data signal.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records in the page, malformed ones included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn test_envelope_decodes_upstream_body() {
        let envelope: PageEnvelope<Value> = serde_json::from_value(json!({
            "data": [{"customer_id": "C1"}],
            "total": 25,
            "page": 1,
            "limit": 10
        }))
        .unwrap();

        assert_eq!(envelope.data.len(), 1);
        assert_eq!(envelope.total, 25);
    }

    #[test]
    fn test_envelope_without_data_is_empty() {
        let envelope: PageEnvelope<Value> = serde_json::from_value(json!({"total": 0})).unwrap();
        assert!(envelope.data.is_empty());
    }

    #[test]
    fn test_page_keeps_malformed_elements_in_order() {
        let page = Page::from_values(
            2,
            10,
            vec![
                json!({"customer_id": "C1", "first_name": "Ann"}),
                json!({"customer_id": "C2", "date_of_birth": "not-a-date"}),
                json!("garbage"),
            ],
        );

        assert_eq!(page.len(), 3);
        assert!(matches!(page.records[0], IncomingRecord::Decoded(_)));
        assert_eq!(page.records[1].customer_id(), Some("C2"));
        assert!(matches!(page.records[1], IncomingRecord::Malformed { .. }));
        assert_eq!(page.records[2].customer_id(), None);
    }

    #[test]
    fn test_empty_page_signals_end() {
        assert!(Page::from_values(5, 10, Vec::new()).is_empty());
    }
}
