//! Guard error taxonomy.
//!
//! # Purpose
//! Every failure the guard can produce is a tagged variant; the API layer
//! maps each variant to a status code and stable error code. No handler
//! inspects message text to pick a status.
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing required fields: {0}")]
    MissingFields(&'static str),
    /// Unknown identifier and wrong password are deliberately collapsed into
    /// this single variant so callers cannot tell which was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is not active")]
    AccountInactive,
    #[error("authentication required")]
    Unauthorized,
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("role does not permit tenant switching")]
    RoleRestriction,
    #[error("no access to the requested tenant")]
    AccessDenied,
    #[error("tenant is unknown or unavailable")]
    InvalidTenant,
    #[error("missing or invalid CSRF token")]
    InvalidCsrfToken,
    #[error("session state is corrupted")]
    InvalidSessionState,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Stable machine-readable code used in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingFields(_) => "missing_fields",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::AccountInactive => "account_inactive",
            AuthError::Unauthorized => "unauthorized",
            AuthError::PermissionDenied(_) => "permission_denied",
            AuthError::RoleRestriction => "role_restriction",
            AuthError::AccessDenied => "access_denied",
            AuthError::InvalidTenant => "invalid_tenant",
            AuthError::InvalidCsrfToken => "invalid_csrf_token",
            AuthError::InvalidSessionState => "invalid_session_state",
            AuthError::Store(_) => "internal",
        }
    }
}
