//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction so every endpoint returns
//! the same envelope: `success: false` plus a stable `code` and a
//! human-readable `message`.
//!
//! # Security considerations
//! - Store failures log details server-side and return a generic message.
//! - Guard errors map to statuses via an explicit table; no handler inspects
//!   message text.
use crate::api::types::{ErrorDetail, ErrorResponse};
use crate::auth::error::AuthError;
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

/// Structured API error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            body: ErrorResponse {
                success: false,
                error: ErrorDetail {
                    code: code.to_string(),
                    message: message.to_string(),
                },
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Build a 400 Bad Request validation error.
pub fn api_validation_error(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// Build a 404 Not Found error.
pub fn api_not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 409 Conflict error with a caller-provided code.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    ApiError::new(StatusCode::CONFLICT, code, message)
}

/// Build a 500 Internal Server Error from a store error, logging the
/// details server-side and returning a generic message.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "storage error");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Build a 500 Internal Server Error without a store error.
pub fn api_internal_message(message: &str) -> ApiError {
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match &err {
            AuthError::MissingFields(_) => StatusCode::BAD_REQUEST,
            // Bad credentials and missing sessions share 401; the client
            // remedy for corrupted session state is also a re-login.
            AuthError::InvalidCredentials
            | AuthError::Unauthorized
            | AuthError::InvalidSessionState => StatusCode::UNAUTHORIZED,
            AuthError::AccountInactive
            | AuthError::PermissionDenied(_)
            | AuthError::RoleRestriction
            | AuthError::AccessDenied
            | AuthError::InvalidCsrfToken => StatusCode::FORBIDDEN,
            AuthError::InvalidTenant => StatusCode::NOT_FOUND,
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let AuthError::Store(store_err) = &err {
            return api_internal("internal error", store_err);
        }
        ApiError::new(status, err.code(), &err.to_string())
    }
}
