//! Stored customer inspection commands.
//!
//! # Usage
//!
//! ```bash
//! cs-cli customers get CUST001
//! cs-cli customers list --page 1 --limit 10
//! ```

use customer_sync_core::{CustomerId, PageEnvelope};
use customer_sync_pipeline::db::{CustomerStore, PgCustomerStore};

use super::{CliError, connect, print_json};

/// Print one stored customer.
///
/// # Errors
///
/// Returns `CliError::NotFound` if no customer has this id.
pub async fn get(customer_id: &str) -> Result<(), CliError> {
    let id = CustomerId::parse(customer_id)
        .map_err(|_| CliError::NotFound(customer_id.to_owned()))?;

    let (_, pool) = connect().await?;
    let store = PgCustomerStore::new(pool);

    let customer = store
        .get(&id)
        .await?
        .ok_or_else(|| CliError::NotFound(customer_id.to_owned()))?;

    print_json(&customer)
}

/// Print one page of stored customers in the HTTP API's envelope.
///
/// # Errors
///
/// Returns `CliError` if the store cannot be queried.
pub async fn list(page: u32, limit: u32) -> Result<(), CliError> {
    let (_, pool) = connect().await?;
    let store = PgCustomerStore::new(pool);

    let offset = u64::from(page.saturating_sub(1)) * u64::from(limit);
    let total = store.count().await?;
    let data = store.list(offset, limit).await?;

    print_json(&PageEnvelope {
        data,
        total,
        page,
        limit,
    })
}
