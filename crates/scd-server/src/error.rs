//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scd_core::ScdError;
use serde::Serialize;
use std::fmt;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

fn status_of(err: &ScdError) -> StatusCode {
    match err {
        ScdError::NotFound { .. } => StatusCode::NOT_FOUND,
        ScdError::Conflict { .. } => StatusCode::CONFLICT,
        ScdError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ScdError::Batch { source, .. } => status_of(source),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// Convert from scd-core errors
impl From<ScdError> for ApiError {
    fn from(err: ScdError) -> Self {
        let status = status_of(&err);
        let code = err.code().as_str();

        let details = match &err {
            ScdError::Batch {
                committed,
                failed_key,
                ..
            } => Some(serde_json::json!({
                "committed": committed,
                "failed_key": failed_key,
            })),
            ScdError::Conflict { .. } => Some(serde_json::json!({ "retryable": err.is_retryable() })),
            _ => err
                .suggestion()
                .map(|s| serde_json::json!({ "suggestion": s })),
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "Request failed");
            format!("Internal error: {}", err)
        } else {
            err.to_string()
        };

        let api = Self::new(status, code, message);
        match details {
            Some(details) => api.with_details(details),
            None => api,
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
