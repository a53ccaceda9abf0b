use std::any::Any;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::error::ErrorResponse;
use crate::services::deal_service::DealServiceError;

pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Failure returned by a handler, rendered as an [`ErrorResponse`]
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            // Never echo the underlying cause to the caller
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                INTERNAL_ERROR_MESSAGE.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();
        let body = ErrorResponse {
            status_code: status.as_u16(),
            error_code: error_code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<DealServiceError> for ApiError {
    fn from(err: DealServiceError) -> Self {
        let message = err.to_string();
        match err {
            DealServiceError::Validation(_) => ApiError::BadRequest(message),
            DealServiceError::Duplicate(_) => ApiError::Conflict(message),
            DealServiceError::Store(_) => ApiError::Internal,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        tracing::debug!("Rejected request body: {}", detail);

        let message = if detail.contains("dealTimestamp") {
            "Invalid timestamp format. Use: yyyy-MM-ddTHH:mm:ss (e.g., 2024-02-16T10:30:00)"
        } else if detail.contains("dealAmount") {
            "Invalid number format for amount"
        } else {
            "Invalid request format"
        };

        ApiError::BadRequest(message.to_string())
    }
}

/// Turn a handler panic into the generic 500 body, logging the payload
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!("Handler panicked: {}", detail);
    ApiError::Internal.into_response()
}
