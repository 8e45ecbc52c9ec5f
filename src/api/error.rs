//! JSON error responses for the REST API

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::ScanError;

#[derive(Debug)]
pub enum ApiError {
    Scan(ScanError),
    BadRequest(String),
    NotFound(String),
    /// A collaborator the route needs is not configured
    Unavailable(&'static str),
    Internal(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Scan(ScanError::AlreadyRunning(_) | ScanError::NotRunning(_)) => {
                StatusCode::CONFLICT
            }
            ApiError::Scan(ScanError::ShowNotFound(_)) | ApiError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Scan(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Scan(e) => e.to_string(),
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg.clone(),
            ApiError::Unavailable(service) => format!("{} is not configured", service),
            ApiError::Internal(e) => format!("{:#}", e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.message(), "API request failed");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<ScanError> for ApiError {
    fn from(e: ScanError) -> Self {
        ApiError::Scan(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
