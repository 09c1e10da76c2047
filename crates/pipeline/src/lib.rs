//! Customer Sync pipeline library.
//!
//! Pulls customer records from a paginated upstream source, reconciles them
//! into a local relational store, and serves the stored records over HTTP.
//!
//! # Guarantees
//!
//! - One ingestion run is one store transaction: it commits once after the
//!   last page, or rolls back entirely.
//! - A bad record is logged and skipped; it never aborts its run.
//! - A field absent or `null` upstream never erases a stored value.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod routes;
pub mod state;
