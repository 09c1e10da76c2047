//! Customer Sync Core - Shared types library.
//!
//! This crate provides the types shared by every customer sync component:
//! - `pipeline` - Ingestion service (fetch, reconcile, commit) and read API
//! - `upstream` - Reference upstream server serving paginated customer JSON
//! - `cli` - Command-line tools for one-shot ingestion and store inspection
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Reconciliation rules that do not need a store (the
//! field-by-field merge) live here so they can be tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Customer identifiers, balances, transport and stored records, pages

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
