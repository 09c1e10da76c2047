//! HTTP route handlers for the upstream source.
//!
//! # Route Structure
//!
//! ```text
//! GET /api/health                   - Health check
//! GET /api/customers?page=&limit=   - Paginated dataset
//! GET /api/customers/{customer_id}  - Single record
//! ```

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};

use customer_sync_core::PageEnvelope;

use crate::dataset::Dataset;

/// Build the upstream router.
pub fn router() -> Router<Dataset> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/customers", get(list_customers))
        .route("/api/customers/{customer_id}", get(get_customer))
}

/// Query parameters for the paginated listing.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

const fn default_page() -> u32 {
    1
}

const fn default_limit() -> u32 {
    10
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn health() -> Json<Value> {
    tracing::info!("Health check endpoint hit");
    Json(json!({ "status": "healthy" }))
}

async fn list_customers(
    State(dataset): State<Dataset>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<PageEnvelope<Value>>, Response> {
    let Query(params) =
        params.map_err(|e| error_response(StatusCode::BAD_REQUEST, &e.body_text()))?;
    if params.page < 1 || params.limit < 1 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "page and limit must be positive integers",
        ));
    }

    tracing::debug!(page = params.page, limit = params.limit, "Fetching customers");
    Ok(Json(dataset.page(params.page, params.limit)))
}

async fn get_customer(
    State(dataset): State<Dataset>,
    Path(customer_id): Path<String>,
) -> Result<Json<Value>, Response> {
    tracing::debug!(%customer_id, "Fetching customer by id");
    dataset.find(&customer_id).cloned().map(Json).ok_or_else(|| {
        tracing::warn!(%customer_id, "Customer not found");
        error_response(StatusCode::NOT_FOUND, "Customer not found")
    })
}
