//! HTTP route handlers for the pipeline service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness check
//! GET  /health/ready                 - Readiness check (store reachable)
//!
//! # Ingestion
//! POST /api/ingest                   - Run one full ingestion
//!
//! # Customers (committed data only)
//! GET  /api/customers                - Paginated listing
//! GET  /api/customers/{customer_id}  - Single customer
//! ```

pub mod customers;
pub mod ingest;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::db::CustomerStore;
use crate::state::AppState;

/// Build the full application router.
pub fn router<S: CustomerStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<S>))
        .merge(ingest::router())
        .merge(customers::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness<S: CustomerStore>(State(state): State<AppState<S>>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::config::IngestConfig;
    use crate::db::MemoryCustomerStore;

    #[tokio::test]
    async fn test_health_endpoints() {
        let config = IngestConfig::new(Url::parse("http://upstream.test").unwrap());
        let state = AppState::new(config, MemoryCustomerStore::new()).unwrap();
        let app = router().with_state(state);

        for uri in ["/health", "/health/ready"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }
}
