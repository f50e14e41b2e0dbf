//! OpenAPI schema aggregation for the authorization API.
//!
//! # Purpose
//! Collects routes and schema types into a single OpenAPI document for docs
//! and client generation.
use crate::api::{
    auth, system, tenants,
    types::{
        CheckResponse, CsrfTokenResponse, ErrorDetail, ErrorResponse, HealthStatus, LoginRequest,
        LoginResponse, MeResponse, OkResponse, SwitchTenantRequest, SwitchTenantResponse,
        SystemInfo, TenantCreateRequest, TenantListResponse, TenantResponse, TenantView,
        UserCreateRequest, UserResponse, UserView,
    },
    users,
};
use crate::model::{TenantStatus, UserRole, UserStatus};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "teamgate",
        version = "v1",
        description = "Session and tenant authorization HTTP API"
    ),
    paths(
        system::system_info,
        system::system_health,
        auth::login,
        auth::logout,
        auth::check,
        auth::csrf_token,
        auth::switch_tenant,
        auth::user_tenants,
        users::me,
        users::create_user,
        tenants::list_tenants,
        tenants::create_tenant,
        tenants::suspend_tenant,
        tenants::activate_tenant,
        tenants::delete_tenant
    ),
    components(schemas(
        SystemInfo,
        HealthStatus,
        ErrorDetail,
        ErrorResponse,
        OkResponse,
        CheckResponse,
        CsrfTokenResponse,
        LoginRequest,
        LoginResponse,
        SwitchTenantRequest,
        SwitchTenantResponse,
        MeResponse,
        UserCreateRequest,
        UserResponse,
        UserView,
        UserRole,
        UserStatus,
        TenantCreateRequest,
        TenantListResponse,
        TenantResponse,
        TenantView,
        TenantStatus
    )),
    tags(
        (name = "system", description = "System and probe endpoints"),
        (name = "auth", description = "Sessions, CSRF, and tenant switching"),
        (name = "users", description = "User accounts"),
        (name = "tenants", description = "Tenant administration")
    )
)]
pub struct ApiDoc;
