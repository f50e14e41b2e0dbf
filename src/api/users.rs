//! User handlers: current-user profile and user provisioning.
//!
//! # Purpose
//! `/v1/users/me` reads session state; `/v1/users` provisions accounts with
//! their memberships, gated by `users.create` (admin wildcard in practice).
use crate::api::error::{
    api_conflict, api_internal, api_internal_message, api_validation_error, ApiError,
};
use crate::api::{require_auth, ApiJson};
use crate::api::types::{MeResponse, TenantView, UserCreateRequest, UserResponse, UserView};
use crate::app::AppState;
use crate::auth::password;
use crate::model::{Tenant, TenantMembership, User, UserRole, UserStatus};
use crate::store::StoreError;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current user and tenant", body = MeResponse),
        (status = 401, description = "No session", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn me(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<MeResponse>, ApiError> {
    let ctx = require_auth(&state, &jar).await?;
    Ok(Json(MeResponse {
        success: true,
        user: UserView::from(&ctx.user),
        tenant: TenantView::from(&ctx.tenant),
    }))
}

#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "users",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid payload", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Username or email taken", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    ApiJson(body): ApiJson<UserCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = require_auth(&state, &jar).await?;
    state
        .guard
        .require_csrf(&ctx, &headers, body.csrf_token.as_deref())?;
    state.guard.require_permission(&ctx, "users.create").await?;

    let username = body.username.trim();
    let email = body.email.trim();
    if username.is_empty() || email.is_empty() || body.password.is_empty() {
        return Err(api_validation_error("username, email, and password are required"));
    }
    match body.role {
        UserRole::StandardUser if body.tenant_codes.len() != 1 => {
            return Err(api_validation_error(
                "standard users are bound to exactly one tenant",
            ));
        }
        UserRole::SpecialUser if body.tenant_codes.is_empty() => {
            return Err(api_validation_error(
                "special users need at least one tenant",
            ));
        }
        _ => {}
    }

    // Resolve every tenant code before creating anything, so a bad code
    // cannot leave a half-provisioned account.
    let mut tenants: Vec<Tenant> = Vec::with_capacity(body.tenant_codes.len());
    for code in &body.tenant_codes {
        let tenant = state
            .store
            .get_tenant_by_code(code)
            .await
            .map_err(|err| api_internal("failed to resolve tenant", &err))?
            .filter(Tenant::is_available)
            .ok_or_else(|| api_validation_error("unknown or unavailable tenant code"))?;
        tenants.push(tenant);
    }

    let password_hash = password::hash_password(&body.password).map_err(|err| {
        tracing::error!(error = %err, "password hashing failed");
        api_internal_message("failed to create user")
    })?;
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash,
        role: body.role,
        status: UserStatus::Active,
        created_at: Utc::now(),
    };
    // One store write: a failure part-way must not strand an account with
    // half its memberships.
    let memberships = tenants
        .iter()
        .map(|tenant| TenantMembership::new(user.id, tenant.id))
        .collect();
    let user = match state.store.create_user_with_memberships(user, memberships).await {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => {
            return Err(api_conflict("already_exists", "username or email taken"));
        }
        Err(err) => return Err(api_internal("failed to create user", &err)),
    };

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            user: UserView::from(&user),
        }),
    ))
}
