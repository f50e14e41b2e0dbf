use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use teamgate::app::{build_router, AppState};
use teamgate::auth::guard::AuthGuard;
use teamgate::auth::password::hash_password;
use teamgate::auth::session::InMemorySessionStore;
use teamgate::config::CookieSettings;
use teamgate::model::{Tenant, TenantMembership, TenantStatus, User, UserRole, UserStatus};
use teamgate::store::memory::InMemoryStore;
use teamgate::store::AuthStore;
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse battery staple";
pub const COOKIE_NAME: &str = "teamgate_session";

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// The `name=value` pair of the session cookie set by a login response.
pub fn session_cookie_pair(response: &axum::response::Response) -> String {
    let set_cookie = response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .expect("ascii cookie");
    set_cookie.split(';').next().expect("cookie pair").to_string()
}

pub struct TestEnv {
    pub store: Arc<InMemoryStore>,
    pub app: axum::routing::RouterIntoService<axum::body::Body, ()>,
}

pub fn build_env() -> TestEnv {
    let store = Arc::new(InMemoryStore::new());
    let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(3600)));
    let guard = AuthGuard::new(store.clone(), sessions);
    let state = AppState {
        api_version: "v1".to_string(),
        guard,
        store: store.clone(),
        cookies: CookieSettings {
            name: COOKIE_NAME.to_string(),
            secure: false,
        },
    };
    TestEnv {
        store,
        app: build_router(state).into_service(),
    }
}

impl TestEnv {
    pub async fn seed_tenant(&self, code: &str, status: TenantStatus) -> Tenant {
        let tenant = Tenant {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: code.to_uppercase(),
            status,
            storage_quota_bytes: 1 << 30,
            tier: "standard".to_string(),
            deleted_at: None,
        };
        self.store
            .create_tenant(tenant.clone())
            .await
            .expect("seed tenant");
        tenant
    }

    pub async fn seed_user(
        &self,
        username: &str,
        role: UserRole,
        status: UserStatus,
        tenants: &[&Tenant],
    ) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.test"),
            password_hash: hash_password(PASSWORD).expect("hash"),
            role,
            status,
            created_at: Utc::now(),
        };
        self.store.create_user(user.clone()).await.expect("seed user");
        for tenant in tenants {
            self.store
                .add_membership(TenantMembership::new(user.id, tenant.id))
                .await
                .expect("seed membership");
        }
        user
    }
}
