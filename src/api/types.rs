//! HTTP API request/response types.
//!
//! # Purpose
//! Defines the payload shapes for the REST API and OpenAPI schema
//! generation. Every response carries a `success` boolean; failures carry a
//! structured `error` object (one consistent envelope across all
//! endpoints).
use crate::model::{Tenant, TenantStatus, User, UserRole, UserStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

/// Public projection of a user: everything except the password hash.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            status: user.status,
        }
    }
}

/// Public projection of a tenant (soft-delete stamp omitted; deleted
/// tenants never appear in responses).
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct TenantView {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub status: TenantStatus,
    pub tier: String,
    pub storage_quota_bytes: i64,
}

impl From<&Tenant> for TenantView {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            code: tenant.code.clone(),
            name: tenant.name.clone(),
            status: tenant.status,
            tier: tenant.tier.clone(),
            storage_quota_bytes: tenant.storage_quota_bytes,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct LoginRequest {
    /// Either `username` or `email` identifies the account.
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
    pub tenant_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserView,
    pub tenant: TenantView,
    pub csrf_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckResponse {
    pub success: bool,
    pub authenticated: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CsrfTokenResponse {
    pub success: bool,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct SwitchTenantRequest {
    pub tenant_id: Uuid,
    /// Accepted here as an alternative to the `X-CSRF-Token` header.
    pub csrf_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SwitchTenantResponse {
    pub success: bool,
    pub tenant: TenantView,
    pub previous_tenant_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub success: bool,
    pub user: UserView,
    pub tenant: TenantView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantListResponse {
    pub success: bool,
    pub items: Vec<TenantView>,
}

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct TenantCreateRequest {
    pub code: String,
    pub name: String,
    pub tier: Option<String>,
    pub storage_quota_bytes: Option<i64>,
    pub csrf_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantResponse {
    pub success: bool,
    pub tenant: TenantView,
}

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct UserCreateRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    /// Tenants the new user belongs to, by code. Standard users need
    /// exactly one; special users at least one.
    #[serde(default)]
    pub tenant_codes: Vec<String>,
    pub csrf_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SystemInfo {
    pub success: bool,
    pub api_version: String,
    pub storage_backend: String,
    pub durable_storage: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub success: bool,
    pub status: String,
}
