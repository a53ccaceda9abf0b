//! Per-request correlation ids
//!
//! Every request gets a [`CorrelationId`], taken from the `x-correlation-id`
//! header when the caller sends one. It is stored in the request extensions
//! for handlers to pass down explicitly, echoed back on the response, and
//! used to log method, path, status and timing.

use std::fmt;
use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accept a caller-supplied id if it is short printable ASCII
    fn from_header(value: &HeaderValue) -> Option<Self> {
        let value = value.to_str().ok()?.trim();
        if value.is_empty() || value.len() > 128 {
            return None;
        }
        Some(Self(value.to_string()))
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub async fn correlation_id(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(CorrelationId::from_header)
        .unwrap_or_default();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    request.extensions_mut().insert(correlation_id.clone());
    tracing::info!(correlation_id = %correlation_id, %method, %path, "request started");

    let mut response = next.run(request).await;

    let elapsed_ms = start.elapsed().as_millis() as u64;
    let status = response.status();
    if status.is_server_error() {
        tracing::error!(correlation_id = %correlation_id, %method, %path, status = status.as_u16(), elapsed_ms, "request failed");
    } else {
        tracing::info!(correlation_id = %correlation_id, %method, %path, status = status.as_u16(), elapsed_ms, "request completed");
    }

    if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(CORRELATION_ID_HEADER), value);
    }

    response
}
