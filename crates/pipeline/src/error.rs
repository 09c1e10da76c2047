//! Unified error handling for the pipeline HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;
use crate::ingest::IngestError;

/// Application-level error type for HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    /// An ingestion run failed and was rolled back.
    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    /// The ingestion task panicked or was aborted.
    #[error("Ingestion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),
}

/// JSON error body: `{"detail": "..."}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Store(_) | Self::Ingest(_) | Self::Task(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Pipeline request error"
            );
        }

        let status = match &self {
            Self::Store(_) | Self::Ingest(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose database internals or panic payloads; ingestion failures carry their cause
        let detail = match &self {
            Self::Store(_) | Self::Task(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ingest::FetchError;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Customer not found".to_string());
        assert_eq!(err.to_string(), "Customer not found");

        let err = AppError::Ingest(IngestError::PageLimitExceeded { max_pages: 5 });
        assert_eq!(
            err.to_string(),
            "Ingestion failed: upstream returned more than 5 non-empty pages"
        );
    }

    #[tokio::test]
    async fn test_app_error_status_codes() {
        let (status, body) = body_of(AppError::NotFound("Customer not found".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Customer not found");

        let (status, _) = body_of(AppError::BadRequest("page must be >= 1".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = body_of(AppError::Ingest(IngestError::UpstreamUnavailable(
            FetchError::Status {
                page: 3,
                status: 502,
            },
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["detail"],
            "Ingestion failed: upstream unavailable: upstream returned HTTP 502 for page 3"
        );
    }

    #[tokio::test]
    async fn test_store_errors_are_not_leaked() {
        let (status, body) = body_of(AppError::Store(StoreError::DataCorruption(
            "negative row count".to_string(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }

    #[tokio::test]
    async fn test_task_failures_are_not_leaked() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let join_err = handle.await.unwrap_err();

        let (status, body) = body_of(AppError::from(join_err)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }
}
