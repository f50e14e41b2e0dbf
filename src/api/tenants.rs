//! Tenant administration handlers.
//!
//! # Purpose
//! Tenant listing, creation, suspension/activation, and soft deletion,
//! each gated by a `tenants.*` permission check against the caller's role
//! table. Deletion is always soft: the row is stamped, never removed.
use crate::api::error::{api_conflict, api_internal, api_validation_error, ApiError};
use crate::api::{require_auth, ApiJson};
use crate::api::types::{
    OkResponse, TenantCreateRequest, TenantListResponse, TenantResponse, TenantView,
};
use crate::app::AppState;
use crate::model::{Tenant, TenantStatus};
use crate::store::StoreError;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use uuid::Uuid;

const DEFAULT_QUOTA_BYTES: i64 = 10 << 30;
const DEFAULT_TIER: &str = "standard";

#[utoipa::path(
    get,
    path = "/v1/tenants",
    tag = "tenants",
    responses(
        (status = 200, description = "List tenants", body = TenantListResponse),
        (status = 403, description = "Missing tenants.view", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_tenants(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<TenantListResponse>, ApiError> {
    let ctx = require_auth(&state, &jar).await?;
    state.guard.require_permission(&ctx, "tenants.view").await?;
    let items = state
        .store
        .list_tenants()
        .await
        .map_err(|err| api_internal("failed to list tenants", &err))?;
    Ok(Json(TenantListResponse {
        success: true,
        items: items.iter().map(TenantView::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/v1/tenants",
    tag = "tenants",
    request_body = TenantCreateRequest,
    responses(
        (status = 201, description = "Tenant created", body = TenantResponse),
        (status = 409, description = "Tenant code already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_tenant(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    ApiJson(body): ApiJson<TenantCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = require_auth(&state, &jar).await?;
    state
        .guard
        .require_csrf(&ctx, &headers, body.csrf_token.as_deref())?;
    state
        .guard
        .require_permission(&ctx, "tenants.create")
        .await?;

    let code = body.code.trim();
    if code.is_empty() || body.name.trim().is_empty() {
        return Err(api_validation_error("code and name are required"));
    }

    let tenant = Tenant {
        id: Uuid::new_v4(),
        code: code.to_string(),
        name: body.name.trim().to_string(),
        status: TenantStatus::Active,
        storage_quota_bytes: body.storage_quota_bytes.unwrap_or(DEFAULT_QUOTA_BYTES),
        tier: body.tier.unwrap_or_else(|| DEFAULT_TIER.to_string()),
        deleted_at: None,
    };
    match state.store.create_tenant(tenant).await {
        Ok(tenant) => Ok((
            StatusCode::CREATED,
            Json(TenantResponse {
                success: true,
                tenant: TenantView::from(&tenant),
            }),
        )),
        Err(StoreError::Conflict(_)) => {
            Err(api_conflict("already_exists", "tenant code already exists"))
        }
        Err(err) => Err(api_internal("failed to create tenant", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/tenants/{tenant_id}/suspend",
    tag = "tenants",
    params(("tenant_id" = Uuid, Path, description = "Tenant identifier")),
    responses(
        (status = 200, description = "Tenant suspended", body = TenantResponse),
        (status = 404, description = "Tenant not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn suspend_tenant(
    Path(tenant_id): Path<Uuid>,
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<TenantResponse>, ApiError> {
    set_status(state, jar, headers, tenant_id, TenantStatus::Suspended).await
}

#[utoipa::path(
    post,
    path = "/v1/tenants/{tenant_id}/activate",
    tag = "tenants",
    params(("tenant_id" = Uuid, Path, description = "Tenant identifier")),
    responses(
        (status = 200, description = "Tenant reactivated", body = TenantResponse),
        (status = 404, description = "Tenant not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn activate_tenant(
    Path(tenant_id): Path<Uuid>,
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<TenantResponse>, ApiError> {
    set_status(state, jar, headers, tenant_id, TenantStatus::Active).await
}

async fn set_status(
    state: AppState,
    jar: CookieJar,
    headers: HeaderMap,
    tenant_id: Uuid,
    status: TenantStatus,
) -> Result<Json<TenantResponse>, ApiError> {
    let ctx = require_auth(&state, &jar).await?;
    state.guard.require_csrf(&ctx, &headers, None)?;
    state
        .guard
        .require_permission(&ctx, "tenants.update")
        .await?;
    match state.store.set_tenant_status(tenant_id, status).await {
        Ok(tenant) => Ok(Json(TenantResponse {
            success: true,
            tenant: TenantView::from(&tenant),
        })),
        Err(StoreError::NotFound(_)) => {
            Err(crate::api::error::api_not_found("tenant not found"))
        }
        Err(err) => Err(api_internal("failed to update tenant", &err)),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/tenants/{tenant_id}",
    tag = "tenants",
    params(("tenant_id" = Uuid, Path, description = "Tenant identifier")),
    responses(
        (status = 200, description = "Tenant soft-deleted", body = OkResponse),
        (status = 404, description = "Tenant not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_tenant(
    Path(tenant_id): Path<Uuid>,
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Json<OkResponse>, ApiError> {
    let ctx = require_auth(&state, &jar).await?;
    state.guard.require_csrf(&ctx, &headers, None)?;
    state
        .guard
        .require_permission(&ctx, "tenants.delete")
        .await?;
    match state.store.soft_delete_tenant(tenant_id, Utc::now()).await {
        Ok(()) => Ok(Json(OkResponse { success: true })),
        Err(StoreError::NotFound(_)) => {
            Err(crate::api::error::api_not_found("tenant not found"))
        }
        Err(err) => Err(api_internal("failed to delete tenant", &err)),
    }
}
