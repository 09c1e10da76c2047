//! `PostgreSQL` customer store.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database or an offline query cache.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use customer_sync_core::{AccountBalance, CustomerId, StoredCustomer};

use super::{CustomerSession, CustomerStore, StoreError};

/// Savepoint wrapping the writes of one record.
const RECORD_SAVEPOINT: &str = "reconcile_record";

const SELECT_COLUMNS: &str = "customer_id, first_name, last_name, email, phone, address, \
     date_of_birth, account_balance, created_at";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` customer queries.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    customer_id: CustomerId,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    date_of_birth: Option<NaiveDate>,
    account_balance: Option<AccountBalance>,
    created_at: Option<NaiveDateTime>,
}

impl From<CustomerRow> for StoredCustomer {
    fn from(row: CustomerRow) -> Self {
        Self {
            customer_id: row.customer_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            date_of_birth: row.date_of_birth,
            account_balance: row.account_balance,
            created_at: row.created_at,
        }
    }
}

fn map_write_error(e: sqlx::Error, customer_id: &CustomerId) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(format!("customer {customer_id} already exists"));
    }
    StoreError::Database(e)
}

// =============================================================================
// Store
// =============================================================================

/// Customer store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl CustomerStore for PgCustomerStore {
    type Session = PgCustomerSession;

    #[instrument(skip(self))]
    async fn begin(&self) -> Result<PgCustomerSession, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgCustomerSession { tx })
    }

    #[instrument(skip(self), fields(customer_id = %id))]
    async fn get(&self, id: &CustomerId) -> Result<Option<StoredCustomer>, StoreError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM customers WHERE customer_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list(&self, offset: u64, limit: u32) -> Result<Vec<StoredCustomer>, StoreError> {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM customers ORDER BY customer_id OFFSET $1 LIMIT $2"
        ))
        .bind(offset)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(count)
            .map_err(|_| StoreError::DataCorruption(format!("negative row count {count}")))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Session
// =============================================================================

/// One `PostgreSQL` transaction owned by an ingestion run.
///
/// Per-record isolation uses a savepoint: a failed statement would otherwise
/// abort the whole transaction.
pub struct PgCustomerSession {
    tx: Transaction<'static, Postgres>,
}

impl CustomerSession for PgCustomerSession {
    async fn find(&mut self, id: &CustomerId) -> Result<Option<StoredCustomer>, StoreError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM customers WHERE customer_id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert(&mut self, customer: &StoredCustomer) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO customers (
                customer_id, first_name, last_name, email, phone, address,
                date_of_birth, account_balance, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(&customer.customer_id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.date_of_birth)
        .bind(customer.account_balance)
        .bind(customer.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(e, &customer.customer_id))?;

        Ok(())
    }

    async fn update(&mut self, customer: &StoredCustomer) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE customers
            SET first_name = $2, last_name = $3, email = $4, phone = $5, address = $6,
                date_of_birth = $7, account_balance = $8, created_at = $9
            WHERE customer_id = $1
            ",
        )
        .bind(&customer.customer_id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.date_of_birth)
        .bind(customer.account_balance)
        .bind(customer.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_error(e, &customer.customer_id))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::DataCorruption(format!(
                "customer {} vanished during update",
                customer.customer_id
            )));
        }

        Ok(())
    }

    async fn checkpoint(&mut self) -> Result<(), StoreError> {
        sqlx::query(&format!("SAVEPOINT {RECORD_SAVEPOINT}"))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn release_checkpoint(&mut self) -> Result<(), StoreError> {
        sqlx::query(&format!("RELEASE SAVEPOINT {RECORD_SAVEPOINT}"))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn restore_checkpoint(&mut self) -> Result<(), StoreError> {
        sqlx::query(&format!("ROLLBACK TO SAVEPOINT {RECORD_SAVEPOINT}"))
            .execute(&mut *self.tx)
            .await?;
        // ROLLBACK TO keeps the savepoint alive; drop it so they do not pile up
        sqlx::query(&format!("RELEASE SAVEPOINT {RECORD_SAVEPOINT}"))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
