//! Customer records: the upstream transport shape and the persisted entity.
//!
//! [`CustomerRecord`] is what an upstream page carries. Every field except
//! `customer_id` may be absent or `null`, and the two are treated the same.
//!
//! [`StoredCustomer`] is a row of the local `customers` table. It is created
//! from the first record seen for an identifier ([`StoredCustomer::from_record`])
//! and patched by later ones ([`StoredCustomer::merge`]).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::balance::AccountBalance;
use super::id::CustomerId;
use super::timestamp;

/// A customer record as received from the upstream source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub account_balance: Option<AccountBalance>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub created_at: Option<NaiveDateTime>,
}

impl CustomerRecord {
    /// A record carrying only an identifier; every other field is `None`.
    #[must_use]
    pub const fn new(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
            address: None,
            date_of_birth: None,
            account_balance: None,
            created_at: None,
        }
    }
}

/// A customer persisted in the local store, keyed by `customer_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCustomer {
    pub customer_id: CustomerId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub account_balance: Option<AccountBalance>,
    pub created_at: Option<NaiveDateTime>,
}

impl StoredCustomer {
    /// Build a new stored customer from the first record seen for its id.
    ///
    /// This is a straight field copy: fields that are `None` in the record
    /// are stored as NULL.
    #[must_use]
    pub fn from_record(record: &CustomerRecord) -> Self {
        Self {
            customer_id: record.customer_id.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            address: record.address.clone(),
            date_of_birth: record.date_of_birth,
            account_balance: record.account_balance,
            created_at: record.created_at,
        }
    }

    /// Patch this customer with the non-null fields of `record`.
    ///
    /// A `None` in the record never erases a stored value, and `customer_id`
    /// is never touched. Returns `true` if any field actually changed, so
    /// callers can skip the write for an unchanged record.
    pub fn merge(&mut self, record: &CustomerRecord) -> bool {
        let mut changed = false;
        changed |= overwrite(&mut self.first_name, record.first_name.as_ref());
        changed |= overwrite(&mut self.last_name, record.last_name.as_ref());
        changed |= overwrite(&mut self.email, record.email.as_ref());
        changed |= overwrite(&mut self.phone, record.phone.as_ref());
        changed |= overwrite(&mut self.address, record.address.as_ref());
        changed |= overwrite(&mut self.date_of_birth, record.date_of_birth.as_ref());
        changed |= overwrite(&mut self.account_balance, record.account_balance.as_ref());
        changed |= overwrite(&mut self.created_at, record.created_at.as_ref());
        changed
    }
}

fn overwrite<T: PartialEq + Clone>(slot: &mut Option<T>, incoming: Option<&T>) -> bool {
    match incoming {
        Some(value) if slot.as_ref() != Some(value) => {
            *slot = Some(value.clone());
            true
        }
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn id(s: &str) -> CustomerId {
        CustomerId::parse(s).unwrap()
    }

    fn stored_c1() -> StoredCustomer {
        StoredCustomer {
            customer_id: id("C1"),
            first_name: Some("Ann".to_string()),
            last_name: Some("Lee".to_string()),
            email: Some("a@x.com".to_string()),
            phone: Some("555-1234".to_string()),
            address: Some("1 Main St".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 17),
            account_balance: Some(AccountBalance::from_cents(10_050)),
            created_at: None,
        }
    }

    #[test]
    fn test_decode_full_record() {
        let record: CustomerRecord = serde_json::from_value(json!({
            "customer_id": "C1",
            "first_name": "Ann",
            "last_name": "Lee",
            "email": "a@x.com",
            "phone": "555-1234",
            "address": "1 Main St",
            "date_of_birth": "1990-05-17",
            "account_balance": 100.5,
            "created_at": "2024-01-15T09:30:00"
        }))
        .unwrap();

        assert_eq!(record.customer_id, id("C1"));
        assert_eq!(record.date_of_birth, NaiveDate::from_ymd_opt(1990, 5, 17));
        assert_eq!(record.account_balance, Some(AccountBalance::from_cents(10_050)));
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_decode_absent_and_null_are_equivalent() {
        let absent: CustomerRecord = serde_json::from_value(json!({"customer_id": "C1"})).unwrap();
        let nulls: CustomerRecord = serde_json::from_value(json!({
            "customer_id": "C1",
            "first_name": null,
            "phone": null,
            "account_balance": null,
            "created_at": null
        }))
        .unwrap();

        assert_eq!(absent, nulls);
        assert_eq!(absent, CustomerRecord::new(id("C1")));
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let record: CustomerRecord =
            serde_json::from_value(json!({"customer_id": "C1", "loyalty_tier": "gold"})).unwrap();
        assert_eq!(record, CustomerRecord::new(id("C1")));
    }

    #[test]
    fn test_decode_rejects_missing_or_blank_id() {
        assert!(serde_json::from_value::<CustomerRecord>(json!({"first_name": "Ann"})).is_err());
        assert!(serde_json::from_value::<CustomerRecord>(json!({"customer_id": ""})).is_err());
        assert!(serde_json::from_value::<CustomerRecord>(json!({"customer_id": 7})).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_date() {
        let result = serde_json::from_value::<CustomerRecord>(json!({
            "customer_id": "C1",
            "date_of_birth": "17/05/1990"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_record_copies_nulls() {
        let mut record = CustomerRecord::new(id("C1"));
        record.first_name = Some("Ann".to_string());
        record.email = Some("a@x.com".to_string());

        let stored = StoredCustomer::from_record(&record);
        assert_eq!(stored.customer_id, id("C1"));
        assert_eq!(stored.first_name.as_deref(), Some("Ann"));
        assert_eq!(stored.email.as_deref(), Some("a@x.com"));
        assert_eq!(stored.last_name, None);
        assert_eq!(stored.phone, None);
        assert_eq!(stored.address, None);
        assert_eq!(stored.date_of_birth, None);
        assert_eq!(stored.account_balance, None);
        assert_eq!(stored.created_at, None);
    }

    #[test]
    fn test_from_record_with_only_id() {
        let stored = StoredCustomer::from_record(&CustomerRecord::new(id("C1")));
        assert_eq!(stored.customer_id, id("C1"));
        assert_eq!(stored.first_name, None);
        assert_eq!(stored.email, None);
    }

    #[test]
    fn test_merge_null_preserves_existing() {
        let mut stored = stored_c1();
        let mut record = CustomerRecord::new(id("C1"));
        record.email = Some("new@x.com".to_string());

        assert!(stored.merge(&record));
        assert_eq!(stored.email.as_deref(), Some("new@x.com"));
        assert_eq!(stored.phone.as_deref(), Some("555-1234"));
        assert_eq!(stored.first_name.as_deref(), Some("Ann"));
        assert_eq!(stored.account_balance, Some(AccountBalance::from_cents(10_050)));
    }

    #[test]
    fn test_merge_overwrites_every_non_null_field() {
        let mut stored = stored_c1();
        let record = CustomerRecord {
            customer_id: id("C1"),
            first_name: Some("Anne".to_string()),
            last_name: Some("Li".to_string()),
            email: Some("anne@x.com".to_string()),
            phone: Some("555-9999".to_string()),
            address: Some("2 High St".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1991, 1, 1),
            account_balance: Some(AccountBalance::from_cents(0)),
            created_at: timestamp::parse("2024-01-15T09:30:00"),
        };

        assert!(stored.merge(&record));
        assert_eq!(stored, StoredCustomer::from_record(&record));
    }

    #[test]
    fn test_merge_unchanged_reports_no_change() {
        let mut stored = stored_c1();
        let mut record = CustomerRecord::new(id("C1"));
        record.first_name = Some("Ann".to_string());
        record.phone = Some("555-1234".to_string());

        assert!(!stored.merge(&record));
        assert_eq!(stored, stored_c1());
    }

    #[test]
    fn test_merge_all_null_is_noop() {
        let mut stored = stored_c1();
        assert!(!stored.merge(&CustomerRecord::new(id("C1"))));
        assert_eq!(stored, stored_c1());
    }
}
