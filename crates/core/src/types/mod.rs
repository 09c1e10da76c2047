//! Core types for customer sync.
//!
//! This module provides type-safe wrappers for the customer domain and the
//! pagination envelope shared by the upstream source and the local API.

pub mod balance;
pub mod customer;
pub mod id;
pub mod page;
pub mod timestamp;

pub use balance::AccountBalance;
pub use customer::{CustomerRecord, StoredCustomer};
pub use id::{CustomerId, CustomerIdError};
pub use page::{IncomingRecord, Page, PageEnvelope};
