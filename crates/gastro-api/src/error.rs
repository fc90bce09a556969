//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gastro_store::StoreError;
use gastro_worker::PipelineError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Pipeline(e) => match e {
                PipelineError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                PipelineError::NotARecipe => StatusCode::UNPROCESSABLE_ENTITY,
                PipelineError::PersistConflict(_) => StatusCode::CONFLICT,
                PipelineError::AcquisitionFailed(_) => StatusCode::BAD_GATEWAY,
                PipelineError::RateLimited(_) | PipelineError::QuotaExceeded(_) => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                PipelineError::ExtractionOther(_) | PipelineError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Machine-readable code for clients.
    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Store(_) => "STORAGE_ERROR",
            ApiError::Pipeline(e) => match e {
                PipelineError::InvalidUrl(_) => "INVALID_URL",
                PipelineError::AcquisitionFailed(_) => "DOWNLOAD_FAILED",
                PipelineError::NotARecipe => "NOT_A_RECIPE",
                PipelineError::RateLimited(_) => "RATE_LIMITED",
                PipelineError::QuotaExceeded(_) => "QUOTA_EXCEEDED",
                PipelineError::ExtractionOther(_) => "EXTRACTION_FAILED",
                PipelineError::PersistConflict(_) => "ALREADY_EXISTS",
                PipelineError::Storage(_) => "STORAGE_ERROR",
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.code(), "Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}
