//! HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! This module centralizes route composition to keep `main` small and testable.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::auth::guard::AuthGuard;
use crate::config::CookieSettings;
use crate::observability;
use crate::store::AuthStore;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub api_version: String,
    pub guard: AuthGuard,
    pub store: Arc<dyn AuthStore>,
    pub cookies: CookieSettings,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route(
            "/v1/system/info",
            axum::routing::get(api::system::system_info),
        )
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route("/v1/auth/login", axum::routing::post(api::auth::login))
        .route("/v1/auth/logout", axum::routing::post(api::auth::logout))
        .route("/v1/auth/check", axum::routing::get(api::auth::check))
        .route(
            "/v1/auth/csrf-token",
            axum::routing::get(api::auth::csrf_token),
        )
        .route(
            "/v1/auth/switch-tenant",
            axum::routing::post(api::auth::switch_tenant),
        )
        .route(
            "/v1/user/tenants",
            axum::routing::get(api::auth::user_tenants),
        )
        .route("/v1/users/me", axum::routing::get(api::users::me))
        .route("/v1/users", axum::routing::post(api::users::create_user))
        .route(
            "/v1/tenants",
            axum::routing::get(api::tenants::list_tenants).post(api::tenants::create_tenant),
        )
        .route(
            "/v1/tenants/:tenant_id/suspend",
            axum::routing::post(api::tenants::suspend_tenant),
        )
        .route(
            "/v1/tenants/:tenant_id/activate",
            axum::routing::post(api::tenants::activate_tenant),
        )
        .route(
            "/v1/tenants/:tenant_id",
            axum::routing::delete(api::tenants::delete_tenant),
        )
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}
