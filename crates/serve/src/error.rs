//! HTTP error mapping for the serve crate

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use textproof_core::ProofError;

/// Wrapper turning a [`ProofError`] into an HTTP response.
///
/// Validation problems map to 400, missing resources to 404, everything else
/// (provider failures, engine fatals, storage errors) to 500. The body shape
/// `{"detail": ...}` matches what clients of the service already parse.
pub struct ApiError(pub ProofError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ProofError::Validation { .. } => StatusCode::BAD_REQUEST,
            ProofError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self.0);
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<ProofError>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

/// Shorthand for a 400 response
pub fn bad_request<S: Into<String>>(message: S) -> ApiError {
    ApiError(ProofError::validation(message))
}

/// Shorthand for a 404 response
pub fn not_found<S: Into<String>>(resource: S) -> ApiError {
    ApiError(ProofError::not_found(resource))
}
