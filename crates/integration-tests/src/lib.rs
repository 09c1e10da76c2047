//! Integration tests for customer sync.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (no external services)
//! cargo test -p customer-sync-integration-tests
//!
//! # PostgreSQL-backed tests
//! DATABASE_URL=postgres://localhost/customer_sync_test \
//!     cargo test -p customer-sync-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `end_to_end` - Upstream server and pipeline service over real sockets,
//!   with the in-memory store
//! - `postgres_store` - Store sessions and ingestion runs against `PostgreSQL`
//!
//! The helpers below start servers on ephemeral ports inside the test's own
//! runtime; they stop when the runtime does.

#![cfg_attr(not(test), forbid(unsafe_code))]

use serde_json::{Value, json};
use url::Url;

use customer_sync_pipeline::config::IngestConfig;
use customer_sync_pipeline::db::CustomerStore;
use customer_sync_pipeline::routes;
use customer_sync_pipeline::state::AppState;
use customer_sync_upstream::Dataset;

/// Serve `app` on an ephemeral localhost port and return its base URL.
async fn serve(app: axum::Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no local address");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Test server error");
    });

    Url::parse(&format!("http://{addr}")).expect("Invalid test server URL")
}

/// Start the upstream source over `dataset`.
pub async fn spawn_upstream(dataset: Dataset) -> Url {
    serve(customer_sync_upstream::routes::router().with_state(dataset)).await
}

/// Start the pipeline service over `store`, ingesting from `upstream`.
pub async fn spawn_pipeline<S: CustomerStore + 'static>(store: S, upstream: Url) -> Url {
    spawn_pipeline_with(store, IngestConfig::new(upstream)).await
}

/// Start the pipeline service with explicit ingestion settings.
pub async fn spawn_pipeline_with<S: CustomerStore + 'static>(store: S, config: IngestConfig) -> Url {
    let state = AppState::new(config, store).expect("Failed to create application state");
    serve(routes::router().with_state(state)).await
}

/// `n` complete customer records `CUST001..`.
#[must_use]
pub fn customer_records(n: usize) -> Vec<Value> {
    customer_records_with_prefix("CUST", n)
}

/// `n` complete customer records with ids `{prefix}001..`.
#[must_use]
pub fn customer_records_with_prefix(prefix: &str, n: usize) -> Vec<Value> {
    (1..=n)
        .map(|i| {
            json!({
                "customer_id": format!("{prefix}{i:03}"),
                "first_name": format!("First{i}"),
                "last_name": format!("Last{i}"),
                "email": format!("{}{i}@example.com", prefix.to_lowercase()),
                "phone": format!("555-{i:04}"),
                "address": format!("{i} Main St"),
                "date_of_birth": "1990-05-15",
                "account_balance": "1234.50",
                "created_at": "2024-01-15T10:30:00"
            })
        })
        .collect()
}
