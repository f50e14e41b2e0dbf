//! HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and the shared helpers that resolve the
//! session cookie into an authenticated context.
pub mod auth;
pub mod error;
pub mod openapi;
pub mod system;
pub mod tenants;
pub mod types;
pub mod users;

use crate::api::error::{api_validation_error, ApiError};
use crate::app::AppState;
use crate::auth::guard::AuthContext;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum_extra::extract::cookie::CookieJar;

/// JSON body extractor whose rejection carries the standard error envelope.
///
/// axum's stock `Json` rejects malformed bodies with a plain-text response;
/// every failure leaving this service is a `success: false` JSON body, so
/// handlers take their payloads through this wrapper instead.
pub(crate) struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| api_validation_error(&rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// The raw session cookie value, if the request carries one.
pub(crate) fn session_cookie<'a>(jar: &'a CookieJar, state: &AppState) -> Option<&'a str> {
    jar.get(&state.cookies.name).map(|cookie| cookie.value())
}

/// Resolve the request's session cookie into an authenticated context, or
/// fail with the mapped guard error.
pub(crate) async fn require_auth(
    state: &AppState,
    jar: &CookieJar,
) -> Result<AuthContext, ApiError> {
    let ctx = state
        .guard
        .authenticate(session_cookie(jar, state))
        .await?;
    Ok(ctx)
}
