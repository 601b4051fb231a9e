//! Shared handler utilities
//!
//! Common validation, redirects, and metrics helpers used across handlers.

use std::time::Instant;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;

/// Maximum length for user-provided directory fields
const MAX_FIELD_LEN: usize = 256;

/// Build a 302 response
///
/// The browser flow relies on FOUND; `axum::response::Redirect` emits 303
/// for `to`, which some provider gateways refuse to follow on form posts.
pub fn found(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}

/// Validate a required form field is non-empty and within bounds
pub fn validate_field(value: &str, field_name: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field_name} cannot be empty")));
    }

    if value.len() > MAX_FIELD_LEN {
        return Err(ApiError::BadRequest(format!(
            "{field_name} too long (max {MAX_FIELD_LEN} chars)"
        )));
    }

    Ok(())
}

/// Record operation duration with result label.
///
/// Labels: operation, result (ok/err)
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "portal_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}
