mod common;
mod http_helpers;

use axum::http::StatusCode;
use common::{build_env, read_json, session_cookie_pair, TestEnv, PASSWORD};
use http_helpers::{authed_json_request, authed_request, json_request};
use teamgate::model::{TenantStatus, UserRole, UserStatus};
use tower::ServiceExt;
use uuid::Uuid;

async fn login(env: &TestEnv, username: &str) -> (String, String) {
    let request = json_request(
        "POST",
        "/v1/auth/login",
        serde_json::json!({ "username": username, "password": PASSWORD }),
    );
    let response = env.app.clone().oneshot(request).await.expect("login");
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie_pair(&response);
    let payload = read_json(response).await;
    let csrf = payload["csrf_token"].as_str().expect("token").to_string();
    (cookie, csrf)
}

#[tokio::test]
async fn standard_users_cannot_switch_tenants() {
    let env = build_env();
    let acme = env.seed_tenant("acme", TenantStatus::Active).await;
    let globex = env.seed_tenant("globex", TenantStatus::Active).await;
    env.seed_user("alice", UserRole::StandardUser, UserStatus::Active, &[&acme])
        .await;
    let (cookie, csrf) = login(&env, "alice").await;

    // A real tenant and a nonexistent one produce the same restriction.
    for target in [globex.id, Uuid::new_v4()] {
        let request = authed_json_request(
            "POST",
            "/v1/auth/switch-tenant",
            serde_json::json!({ "tenant_id": target }),
            &cookie,
            Some(&csrf),
        );
        let response = env.app.clone().oneshot(request).await.expect("switch");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let payload = read_json(response).await;
        assert_eq!(payload["error"]["code"], "role_restriction");
    }
}

#[tokio::test]
async fn special_user_switch_follows_membership() {
    let env = build_env();
    let acme = env.seed_tenant("acme", TenantStatus::Active).await;
    let globex = env.seed_tenant("globex", TenantStatus::Active).await;
    let initech = env.seed_tenant("initech", TenantStatus::Active).await;
    let umbrella = env.seed_tenant("umbrella", TenantStatus::Suspended).await;
    env.seed_user(
        "sam",
        UserRole::SpecialUser,
        UserStatus::Active,
        &[&acme, &globex, &umbrella],
    )
    .await;
    let (cookie, csrf) = login(&env, "sam").await;

    let request = authed_json_request(
        "POST",
        "/v1/auth/switch-tenant",
        serde_json::json!({ "tenant_id": globex.id }),
        &cookie,
        Some(&csrf),
    );
    let response = env.app.clone().oneshot(request).await.expect("switch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["tenant"]["code"], "globex");
    assert_eq!(
        payload["previous_tenant_id"].as_str().expect("previous"),
        acme.id.to_string()
    );

    // No membership: denied, and the current tenant stays put.
    let request = authed_json_request(
        "POST",
        "/v1/auth/switch-tenant",
        serde_json::json!({ "tenant_id": initech.id }),
        &cookie,
        Some(&csrf),
    );
    let response = env.app.clone().oneshot(request).await.expect("switch");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let payload = read_json(response).await;
    assert_eq!(payload["error"]["code"], "access_denied");

    // Suspended member tenant and unknown id both read as invalid_tenant.
    for target in [umbrella.id, Uuid::new_v4()] {
        let request = authed_json_request(
            "POST",
            "/v1/auth/switch-tenant",
            serde_json::json!({ "tenant_id": target }),
            &cookie,
            Some(&csrf),
        );
        let response = env.app.clone().oneshot(request).await.expect("switch");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let payload = read_json(response).await;
        assert_eq!(payload["error"]["code"], "invalid_tenant");
    }

    let me = authed_request("GET", "/v1/users/me", &cookie, None);
    let response = env.app.clone().oneshot(me).await.expect("me");
    let payload = read_json(response).await;
    assert_eq!(payload["tenant"]["code"], "globex");
}

#[tokio::test]
async fn admins_switch_without_membership() {
    let env = build_env();
    let acme = env.seed_tenant("acme", TenantStatus::Active).await;
    let globex = env.seed_tenant("globex", TenantStatus::Active).await;
    env.seed_user("root", UserRole::Admin, UserStatus::Active, &[&acme])
        .await;
    let (cookie, csrf) = login(&env, "root").await;

    let request = authed_json_request(
        "POST",
        "/v1/auth/switch-tenant",
        serde_json::json!({ "tenant_id": globex.id }),
        &cookie,
        Some(&csrf),
    );
    let response = env.app.clone().oneshot(request).await.expect("switch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["tenant"]["code"], "globex");
}

#[tokio::test]
async fn switch_is_csrf_protected() {
    let env = build_env();
    let acme = env.seed_tenant("acme", TenantStatus::Active).await;
    let globex = env.seed_tenant("globex", TenantStatus::Active).await;
    env.seed_user("root", UserRole::Admin, UserStatus::Active, &[&acme])
        .await;
    let (cookie, csrf) = login(&env, "root").await;

    // No token at all.
    let request = authed_json_request(
        "POST",
        "/v1/auth/switch-tenant",
        serde_json::json!({ "tenant_id": globex.id }),
        &cookie,
        None,
    );
    let response = env.app.clone().oneshot(request).await.expect("switch");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let payload = read_json(response).await;
    assert_eq!(payload["error"]["code"], "invalid_csrf_token");

    // Forged token.
    let request = authed_json_request(
        "POST",
        "/v1/auth/switch-tenant",
        serde_json::json!({ "tenant_id": globex.id }),
        &cookie,
        Some("forged"),
    );
    let response = env.app.clone().oneshot(request).await.expect("switch");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The token is accepted as a body field as well as a header.
    let request = authed_json_request(
        "POST",
        "/v1/auth/switch-tenant",
        serde_json::json!({ "tenant_id": globex.id, "csrf_token": csrf }),
        &cookie,
        None,
    );
    let response = env.app.clone().oneshot(request).await.expect("switch");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn user_tenants_lists_what_the_role_allows() {
    let env = build_env();
    let acme = env.seed_tenant("acme", TenantStatus::Active).await;
    let globex = env.seed_tenant("globex", TenantStatus::Active).await;
    env.seed_tenant("umbrella", TenantStatus::Suspended).await;
    env.seed_user("root", UserRole::Admin, UserStatus::Active, &[&acme])
        .await;
    env.seed_user("sam", UserRole::SpecialUser, UserStatus::Active, &[&globex])
        .await;

    let (cookie, _) = login(&env, "root").await;
    let request = authed_request("GET", "/v1/user/tenants", &cookie, None);
    let response = env.app.clone().oneshot(request).await.expect("tenants");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    let codes: Vec<&str> = payload["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes.len(), 2);
    assert!(codes.contains(&"acme"));
    assert!(codes.contains(&"globex"));

    let (cookie, _) = login(&env, "sam").await;
    let request = authed_request("GET", "/v1/user/tenants", &cookie, None);
    let response = env.app.clone().oneshot(request).await.expect("tenants");
    let payload = read_json(response).await;
    let items = payload["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["code"], "globex");
}
