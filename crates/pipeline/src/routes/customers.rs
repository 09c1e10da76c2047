//! Read-only customer API over committed data.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    routing::get,
};
use serde::Deserialize;

use customer_sync_core::{CustomerId, PageEnvelope, StoredCustomer};

use crate::db::CustomerStore;
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 10;

/// Build the customers router.
pub fn router<S: CustomerStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/api/customers", get(list_customers::<S>))
        .route("/api/customers/{customer_id}", get(get_customer::<S>))
}

/// Query parameters for the customer listing.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

const fn default_page() -> u32 {
    DEFAULT_PAGE
}

const fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// List stored customers, ordered by `customer_id`.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if `page` or `limit` is not a positive
/// integer, and `AppError::Store` if the store fails.
pub async fn list_customers<S: CustomerStore>(
    State(state): State<AppState<S>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PageEnvelope<StoredCustomer>>, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if params.page < 1 {
        return Err(AppError::BadRequest("page must be >= 1".to_string()));
    }
    if params.limit < 1 {
        return Err(AppError::BadRequest("limit must be >= 1".to_string()));
    }

    let offset = u64::from(params.page - 1) * u64::from(params.limit);
    let total = state.store().count().await?;
    let data = state.store().list(offset, params.limit).await?;

    Ok(Json(PageEnvelope {
        data,
        total,
        page: params.page,
        limit: params.limit,
    }))
}

/// Get one stored customer.
///
/// # Errors
///
/// Returns `AppError::NotFound` if no customer has this id, and
/// `AppError::Store` if the store fails.
pub async fn get_customer<S: CustomerStore>(
    State(state): State<AppState<S>>,
    Path(customer_id): Path<String>,
) -> Result<Json<StoredCustomer>, AppError> {
    let not_found = || AppError::NotFound("Customer not found".to_string());

    // An id that cannot be stored cannot be found either
    let id = CustomerId::parse(&customer_id).map_err(|_| not_found())?;

    state
        .store()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::config::IngestConfig;
    use crate::db::MemoryCustomerStore;

    fn customer(id: &str) -> StoredCustomer {
        StoredCustomer {
            customer_id: CustomerId::parse(id).unwrap(),
            first_name: Some("Ann".to_string()),
            last_name: Some("Lee".to_string()),
            email: Some(format!("{}@x.com", id.to_lowercase())),
            phone: Some("555-1234".to_string()),
            address: None,
            date_of_birth: None,
            account_balance: None,
            created_at: None,
        }
    }

    async fn seeded_app(ids: &[&str]) -> Router {
        let store = MemoryCustomerStore::new();
        for id in ids {
            store.seed(customer(id)).await;
        }
        let config = IngestConfig::new(Url::parse("http://upstream.test").unwrap());
        router().with_state(AppState::new(config, store).unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_list_defaults_and_ordering() {
        let app = seeded_app(&["C3", "C1", "C2"]).await;
        let (status, body) = get_json(app, "/api/customers").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["page"], 1);
        assert_eq!(body["limit"], 10);
        let ids: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["customer_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["C1", "C2", "C3"]);
    }

    #[tokio::test]
    async fn test_list_second_page() {
        let app = seeded_app(&["C1", "C2", "C3"]).await;
        let (status, body) = get_json(app, "/api/customers?page=2&limit=2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["customer_id"], "C3");
    }

    #[tokio::test]
    async fn test_list_rejects_bad_params() {
        for uri in [
            "/api/customers?page=0",
            "/api/customers?limit=0",
            "/api/customers?page=-1",
            "/api/customers?limit=many",
        ] {
            let app = seeded_app(&[]).await;
            let (status, body) = get_json(app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["detail"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_get_customer() {
        let app = seeded_app(&["C1"]).await;
        let (status, body) = get_json(app, "/api/customers/C1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "c1@x.com");
        assert_eq!(body["phone"], "555-1234");
        assert_eq!(body["address"], Value::Null);
    }

    #[tokio::test]
    async fn test_get_missing_customer() {
        let app = seeded_app(&["C1"]).await;
        let (status, body) = get_json(app, "/api/customers/C404").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "Customer not found"}));
    }
}
