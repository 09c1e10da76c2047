//! Reference upstream customer source.
//!
//! Serves a fixed customer dataset through the paginated list endpoint that
//! the pipeline ingests from, plus single-record lookup and a health probe.
//! The dataset is loaded once at startup and never reloaded.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod dataset;
pub mod routes;

pub use dataset::{Dataset, DatasetError};
