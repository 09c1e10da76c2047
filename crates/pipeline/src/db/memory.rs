//! In-process customer store.
//!
//! Holds committed customers in a `BTreeMap` (so listing is ordered by
//! `customer_id`, like the `PostgreSQL` store) and gives each session a private
//! write set that only reaches the map on commit. A checkpoint keeps an undo
//! log of the keys written since it was taken.
//!
//! Faults can be injected to exercise failure paths: a rejected commit, a
//! rejected checkpoint release, or a lookup that fails for a specific
//! customer.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use customer_sync_core::{CustomerId, StoredCustomer};

use super::{CustomerSession, CustomerStore, StoreError};

/// In-memory customer store. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryCustomerStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    committed: RwLock<BTreeMap<CustomerId, StoredCustomer>>,
    faults: RwLock<Faults>,
}

#[derive(Default)]
struct Faults {
    fail_next_commit: bool,
    fail_next_release: bool,
    failing_lookups: HashSet<CustomerId>,
}

impl MemoryCustomerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a customer straight into the committed state.
    pub async fn seed(&self, customer: StoredCustomer) {
        self.inner
            .committed
            .write()
            .await
            .insert(customer.customer_id.clone(), customer);
    }

    /// All committed customers, ordered by id.
    pub async fn snapshot(&self) -> Vec<StoredCustomer> {
        self.inner.committed.read().await.values().cloned().collect()
    }

    /// Make the next session commit fail.
    pub async fn fail_next_commit(&self) {
        self.inner.faults.write().await.fail_next_commit = true;
    }

    /// Make the next checkpoint release fail.
    pub async fn fail_next_release(&self) {
        self.inner.faults.write().await.fail_next_release = true;
    }

    /// Make every session lookup of `id` fail until cleared.
    pub async fn fail_lookups_for(&self, id: CustomerId) {
        self.inner.faults.write().await.failing_lookups.insert(id);
    }

    /// Remove all injected faults.
    pub async fn clear_faults(&self) {
        *self.inner.faults.write().await = Faults::default();
    }
}

impl CustomerStore for MemoryCustomerStore {
    type Session = MemoryCustomerSession;

    async fn begin(&self) -> Result<MemoryCustomerSession, StoreError> {
        Ok(MemoryCustomerSession {
            store: Arc::clone(&self.inner),
            pending: BTreeMap::new(),
            undo: None,
        })
    }

    async fn get(&self, id: &CustomerId) -> Result<Option<StoredCustomer>, StoreError> {
        Ok(self.inner.committed.read().await.get(id).cloned())
    }

    async fn list(&self, offset: u64, limit: u32) -> Result<Vec<StoredCustomer>, StoreError> {
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .inner
            .committed
            .read()
            .await
            .values()
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.inner.committed.read().await.len() as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// A session over [`MemoryCustomerStore`]: a private write set on top of the
/// committed map.
pub struct MemoryCustomerSession {
    store: Arc<MemoryInner>,
    pending: BTreeMap<CustomerId, StoredCustomer>,
    /// Pending values replaced since the checkpoint, oldest first.
    undo: Option<Vec<(CustomerId, Option<StoredCustomer>)>>,
}

impl MemoryCustomerSession {
    async fn exists(&self, id: &CustomerId) -> bool {
        self.pending.contains_key(id) || self.store.committed.read().await.contains_key(id)
    }

    fn stage(&mut self, customer: &StoredCustomer) {
        let previous = self
            .pending
            .insert(customer.customer_id.clone(), customer.clone());
        if let Some(undo) = &mut self.undo {
            undo.push((customer.customer_id.clone(), previous));
        }
    }
}

impl CustomerSession for MemoryCustomerSession {
    async fn find(&mut self, id: &CustomerId) -> Result<Option<StoredCustomer>, StoreError> {
        if self.store.faults.read().await.failing_lookups.contains(id) {
            return Err(StoreError::Unavailable(format!("lookup of {id} failed")));
        }

        if let Some(customer) = self.pending.get(id) {
            return Ok(Some(customer.clone()));
        }
        Ok(self.store.committed.read().await.get(id).cloned())
    }

    async fn insert(&mut self, customer: &StoredCustomer) -> Result<(), StoreError> {
        if self.exists(&customer.customer_id).await {
            return Err(StoreError::Conflict(format!(
                "customer {} already exists",
                customer.customer_id
            )));
        }
        self.stage(customer);
        Ok(())
    }

    async fn update(&mut self, customer: &StoredCustomer) -> Result<(), StoreError> {
        if !self.exists(&customer.customer_id).await {
            return Err(StoreError::DataCorruption(format!(
                "customer {} vanished during update",
                customer.customer_id
            )));
        }
        self.stage(customer);
        Ok(())
    }

    async fn checkpoint(&mut self) -> Result<(), StoreError> {
        self.undo = Some(Vec::new());
        Ok(())
    }

    async fn release_checkpoint(&mut self) -> Result<(), StoreError> {
        {
            let mut faults = self.store.faults.write().await;
            if faults.fail_next_release {
                faults.fail_next_release = false;
                return Err(StoreError::Unavailable("release rejected".to_string()));
            }
        }

        self.undo = None;
        Ok(())
    }

    async fn restore_checkpoint(&mut self) -> Result<(), StoreError> {
        for (id, previous) in self.undo.take().into_iter().flatten().rev() {
            match previous {
                Some(customer) => {
                    self.pending.insert(id, customer);
                }
                None => {
                    self.pending.remove(&id);
                }
            }
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        {
            let mut faults = self.store.faults.write().await;
            if faults.fail_next_commit {
                faults.fail_next_commit = false;
                return Err(StoreError::Unavailable("commit rejected".to_string()));
            }
        }

        self.store.committed.write().await.extend(self.pending);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
