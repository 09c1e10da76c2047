//! Customer store: the local relational persistence layer.
//!
//! # Tables
//!
//! - `customers` - One row per upstream `customer_id` (see `sql/schema.sql`)
//!
//! # Sessions
//!
//! Ingestion never writes through the pool directly. A run opens one
//! [`CustomerSession`] (a database transaction), stages every insert and update
//! in it, and ends it with exactly one `commit` or `rollback`. Reads for the
//! HTTP API go through [`CustomerStore`] and only ever see committed data.
//!
//! Two implementations are provided: [`PgCustomerStore`] for `PostgreSQL` and
//! [`MemoryCustomerStore`], an in-process store with fault injection used by
//! tests and local tooling.
//!
//! # Schema
//!
//! The table is created with `CREATE TABLE IF NOT EXISTS` when the service
//! starts ([`ensure_schema`]). There is no migration history.

pub mod customers;
pub mod memory;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use customer_sync_core::{CustomerId, StoredCustomer};

pub use customers::{PgCustomerSession, PgCustomerStore};
pub use memory::{MemoryCustomerSession, MemoryCustomerStore};

/// DDL for the `customers` table.
const SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., duplicate `customer_id`).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to committed customers, and the entry point for sessions.
pub trait CustomerStore: Send + Sync {
    /// The transaction type handed to an ingestion run.
    type Session: CustomerSession;

    /// Open a new session. Nothing written through it is visible to readers
    /// until it is committed.
    fn begin(&self) -> impl Future<Output = Result<Self::Session, StoreError>> + Send;

    /// Get a committed customer by id.
    fn get(
        &self,
        id: &CustomerId,
    ) -> impl Future<Output = Result<Option<StoredCustomer>, StoreError>> + Send;

    /// List committed customers ordered by `customer_id`.
    fn list(
        &self,
        offset: u64,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<StoredCustomer>, StoreError>> + Send;

    /// Count committed customers.
    fn count(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Check that the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// One transaction, exclusively owned by a single ingestion run.
///
/// Writes stay pending until [`commit`](Self::commit). Dropping a session
/// without committing discards its writes.
pub trait CustomerSession: Send {
    /// Look up a customer by id, seeing this session's own pending writes.
    fn find(
        &mut self,
        id: &CustomerId,
    ) -> impl Future<Output = Result<Option<StoredCustomer>, StoreError>> + Send;

    /// Stage a new customer.
    fn insert(
        &mut self,
        customer: &StoredCustomer,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stage new values for an existing customer.
    fn update(
        &mut self,
        customer: &StoredCustomer,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Mark a point that [`restore_checkpoint`](Self::restore_checkpoint) can
    /// return to. Used to isolate the writes of a single record.
    fn checkpoint(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Keep everything written since the last checkpoint.
    fn release_checkpoint(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Discard everything written since the last checkpoint.
    fn restore_checkpoint(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Make all pending writes visible at once.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Discard all pending writes.
    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Create the `customers` table if it does not exist yet.
///
/// # Errors
///
/// Returns `sqlx::Error` if the statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}
