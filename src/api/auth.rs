//! Session API handlers: login, logout, session check, CSRF token, and
//! tenant switch.
//!
//! # Purpose
//! The cookie-facing edge of the guard. Handlers here own cookie issuance
//! and expiry; everything else is delegated to [`crate::auth::guard`].
use crate::api::error::ApiError;
use crate::api::types::{
    CheckResponse, CsrfTokenResponse, LoginRequest, LoginResponse, OkResponse,
    SwitchTenantRequest, SwitchTenantResponse, TenantListResponse, TenantView, UserView,
};
use crate::api::{require_auth, session_cookie, ApiJson};
use crate::app::AppState;
use crate::auth::session::SessionId;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

fn session_cookie_for(state: &AppState, value: String) -> Cookie<'static> {
    Cookie::build((state.cookies.name.clone(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.cookies.secure)
        .build()
}

fn expired_session_cookie(state: &AppState) -> Cookie<'static> {
    Cookie::build((state.cookies.name.clone(), ""))
        .path("/")
        .build()
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Account inactive", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let identifier = body
        .username
        .as_deref()
        .or(body.email.as_deref())
        .unwrap_or("");
    let prior = session_cookie(&jar, &state).map(SessionId::from_cookie_value);
    let outcome = state
        .guard
        .login(identifier, &body.password, body.tenant_code.as_deref(), prior)
        .await?;

    let jar = jar.add(session_cookie_for(
        &state,
        outcome.session_id.as_str().to_string(),
    ));
    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            user: UserView::from(&outcome.user),
            tenant: TenantView::from(&outcome.tenant),
            csrf_token: outcome.csrf_token,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session destroyed (idempotent)", body = OkResponse)
    )
)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<OkResponse>) {
    let session_id = session_cookie(&jar, &state).map(SessionId::from_cookie_value);
    state.guard.logout(session_id).await;
    let jar = jar.remove(expired_session_cookie(&state));
    (jar, Json(OkResponse { success: true }))
}

#[utoipa::path(
    get,
    path = "/v1/auth/check",
    tag = "auth",
    responses(
        (status = 200, description = "Whether the request holds a live session", body = CheckResponse)
    )
)]
pub(crate) async fn check(State(state): State<AppState>, jar: CookieJar) -> Json<CheckResponse> {
    let authenticated = state
        .guard
        .is_authenticated(session_cookie(&jar, &state))
        .await;
    Json(CheckResponse {
        success: true,
        authenticated,
    })
}

#[utoipa::path(
    get,
    path = "/v1/auth/csrf-token",
    tag = "auth",
    responses(
        (status = 200, description = "The session's anti-forgery token", body = CsrfTokenResponse),
        (status = 401, description = "No session", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn csrf_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<CsrfTokenResponse>, ApiError> {
    let ctx = require_auth(&state, &jar).await?;
    let token = state.guard.csrf_token(&ctx).await;
    Ok(Json(CsrfTokenResponse {
        success: true,
        csrf_token: token,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/auth/switch-tenant",
    tag = "auth",
    request_body = SwitchTenantRequest,
    responses(
        (status = 200, description = "Current tenant replaced", body = SwitchTenantResponse),
        (status = 403, description = "Role restriction, missing membership, or CSRF failure", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Unknown or unavailable tenant", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn switch_tenant(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    ApiJson(body): ApiJson<SwitchTenantRequest>,
) -> Result<Json<SwitchTenantResponse>, ApiError> {
    let ctx = require_auth(&state, &jar).await?;
    state
        .guard
        .require_csrf(&ctx, &headers, body.csrf_token.as_deref())?;
    let tenant = state.guard.switch_tenant(&ctx, body.tenant_id).await?;
    Ok(Json(SwitchTenantResponse {
        success: true,
        tenant: TenantView::from(&tenant),
        previous_tenant_id: Some(ctx.tenant.id),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/user/tenants",
    tag = "auth",
    responses(
        (status = 200, description = "Tenants the caller may switch into", body = TenantListResponse),
        (status = 401, description = "No session", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn user_tenants(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<TenantListResponse>, ApiError> {
    let ctx = require_auth(&state, &jar).await?;
    let tenants = state
        .guard
        .available_tenants(&ctx.user)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(TenantListResponse {
        success: true,
        items: tenants.iter().map(TenantView::from).collect(),
    }))
}
