//! The session/tenant authorization guard.
//!
//! # Purpose and responsibility
//! Resolves raw request data (session cookie, CSRF header, login payload)
//! into an authenticated identity plus a current tenant, and answers
//! permission questions for handlers. Every API endpoint consumes this as a
//! precondition; none of them touch the session or user store directly.
//!
//! # Key invariants
//! - A session's current tenant is always one its user is authorized for,
//!   and was active and not soft-deleted when set. All validation happens
//!   before any session write, so a failed operation never partially
//!   mutates session state.
//! - Tenant-switch checks run in a fixed order: role, then existence and
//!   availability, then membership. A standard user probing an arbitrary id
//!   learns nothing beyond its own role restriction.
//!
//! # Security considerations
//! - Unknown identifier and wrong password are indistinguishable to the
//!   caller, including in timing (a dummy verification burns the same
//!   Argon2 work for unknown identifiers).
//! - Login regenerates the session id; a pre-login id is never carried into
//!   an authenticated session (fixation defense).
//! - Passwords and tokens never appear in logs or error messages.
use crate::auth::csrf;
use crate::auth::error::AuthError;
use crate::auth::password;
use crate::auth::permissions;
use crate::auth::session::{SessionId, SessionRecord, SessionStore};
use crate::model::{Tenant, User, UserRole};
use crate::store::AuthStore;
use axum::http::HeaderMap;
use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use uuid::Uuid;

const CSRF_HEADER: &str = "x-csrf-token";

/// An authenticated request context: the live session plus the resolved
/// user and tenant rows.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session_id: SessionId,
    pub record: SessionRecord,
    pub user: User,
    pub tenant: Tenant,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session_id: SessionId,
    pub csrf_token: String,
    pub user: User,
    pub tenant: Tenant,
}

#[derive(Clone)]
pub struct AuthGuard {
    store: Arc<dyn AuthStore>,
    sessions: Arc<dyn SessionStore>,
}

impl AuthGuard {
    pub fn new(store: Arc<dyn AuthStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { store, sessions }
    }

    /// Authenticate a login attempt and establish a fresh session.
    ///
    /// Credential checks run first and collapse all failures into
    /// `invalid_credentials`; the account-status check runs only after the
    /// password verified, so `account_inactive` is only ever reported to the
    /// account owner. Tenant resolution happens last.
    ///
    /// # Errors
    /// - `MissingFields` for empty identifier or password.
    /// - `InvalidCredentials` for unknown identifier or wrong password.
    /// - `AccountInactive` for a correct password on a non-active account.
    /// - `InvalidTenant` when no authorized, available tenant resolves.
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
        tenant_code: Option<&str>,
        prior_session: Option<SessionId>,
    ) -> Result<LoginOutcome, AuthError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || secret.is_empty() {
            return Err(AuthError::MissingFields("identifier and password"));
        }

        let user = match self.store.find_user_by_identifier(identifier).await? {
            Some(user) => user,
            None => {
                // Equalize the cost of the unknown-identifier path.
                password::dummy_verify(secret);
                counter!("teamgate_login_failures_total").increment(1);
                return Err(AuthError::InvalidCredentials);
            }
        };
        if !password::verify_password(secret, &user.password_hash) {
            counter!("teamgate_login_failures_total").increment(1);
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active() {
            counter!("teamgate_login_failures_total").increment(1);
            return Err(AuthError::AccountInactive);
        }

        let tenant = match tenant_code {
            Some(code) => self.resolve_requested_tenant(&user, code).await?,
            None => self.resolve_default_tenant(&user).await?,
        };

        // Regenerate the session id: any pre-login session dies here.
        if let Some(prior) = prior_session {
            self.sessions.remove(&prior).await;
        }
        let csrf_token = csrf::generate_token();
        let mut record = SessionRecord::new(user.id, tenant.id);
        record.csrf_token = Some(csrf_token.clone());
        let session_id = self.sessions.create(record).await;

        counter!("teamgate_logins_total").increment(1);
        tracing::info!(user_id = %user.id, tenant_id = %tenant.id, "login");
        Ok(LoginOutcome {
            session_id,
            csrf_token,
            user,
            tenant,
        })
    }

    /// Destroy a session. Idempotent: logging out without a session is fine.
    pub async fn logout(&self, session_id: Option<SessionId>) {
        if let Some(id) = session_id {
            self.sessions.remove(&id).await;
        }
    }

    /// Resolve a session cookie value into an authenticated context and
    /// touch the session's activity timestamp.
    ///
    /// # Errors
    /// - `Unauthorized` without a live session, or when the session's
    ///   current tenant has since been suspended or soft-deleted (the
    ///   session is destroyed so the invariant holds).
    /// - `InvalidSessionState` when the session references a user or tenant
    ///   row that no longer exists.
    pub async fn authenticate(&self, cookie_value: Option<&str>) -> Result<AuthContext, AuthError> {
        let Some(value) = cookie_value else {
            return Err(AuthError::Unauthorized);
        };
        let session_id = SessionId::from_cookie_value(value);
        let Some(mut record) = self.sessions.get(&session_id).await else {
            return Err(AuthError::Unauthorized);
        };

        let user = match self.store.get_user(record.user_id).await? {
            Some(user) => user,
            None => {
                tracing::warn!(user_id = %record.user_id, "session references missing user");
                return Err(AuthError::InvalidSessionState);
            }
        };
        if !user.is_active() {
            self.sessions.remove(&session_id).await;
            return Err(AuthError::Unauthorized);
        }
        let tenant = match self.store.get_tenant(record.tenant_id).await? {
            Some(tenant) => tenant,
            None => {
                tracing::warn!(tenant_id = %record.tenant_id, "session references missing tenant");
                return Err(AuthError::InvalidSessionState);
            }
        };
        if !tenant.is_available() {
            // The current tenant was suspended or deleted out from under the
            // session; destroy it rather than serve a forbidden context.
            self.sessions.remove(&session_id).await;
            return Err(AuthError::Unauthorized);
        }

        record.last_activity = Utc::now();
        self.sessions.put(&session_id, record.clone()).await;
        Ok(AuthContext {
            session_id,
            record,
            user,
            tenant,
        })
    }

    /// Whether the cookie resolves to a live authenticated session.
    pub async fn is_authenticated(&self, cookie_value: Option<&str>) -> bool {
        self.authenticate(cookie_value).await.is_ok()
    }

    /// Switch the session's current tenant.
    ///
    /// Check order is fixed and deliberate: role first, then existence and
    /// availability, then membership. All session writes happen after every
    /// check has passed.
    ///
    /// # Errors
    /// - `RoleRestriction` for standard users, regardless of the target.
    /// - `InvalidTenant` for missing, suspended, or soft-deleted targets.
    /// - `AccessDenied` for special users without a membership row.
    pub async fn switch_tenant(
        &self,
        ctx: &AuthContext,
        tenant_id: Uuid,
    ) -> Result<Tenant, AuthError> {
        if ctx.user.role == UserRole::StandardUser {
            return Err(AuthError::RoleRestriction);
        }
        let tenant = self
            .store
            .get_tenant(tenant_id)
            .await?
            .filter(Tenant::is_available)
            .ok_or(AuthError::InvalidTenant)?;
        if ctx.user.role == UserRole::SpecialUser {
            let membership = self.store.membership(ctx.user.id, tenant.id).await?;
            if membership.is_none() {
                return Err(AuthError::AccessDenied);
            }
        }

        let mut record = ctx.record.clone();
        record.previous_tenant_id = Some(record.tenant_id);
        record.tenant_id = tenant.id;
        record.last_activity = Utc::now();
        self.sessions.put(&ctx.session_id, record).await;

        counter!("teamgate_tenant_switches_total").increment(1);
        tracing::info!(
            user_id = %ctx.user.id,
            from = %ctx.tenant.id,
            to = %tenant.id,
            "tenant switch"
        );
        Ok(tenant)
    }

    /// Check a dot-namespaced permission against the role table plus any
    /// membership override for the current tenant.
    pub async fn require_permission(
        &self,
        ctx: &AuthContext,
        permission: &str,
    ) -> Result<(), AuthError> {
        let membership = self.store.membership(ctx.user.id, ctx.tenant.id).await?;
        let extra = membership
            .map(|m| m.extra_permissions)
            .unwrap_or_default();
        if permissions::is_granted(ctx.user.role, &extra, permission) {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied(permission.to_string()))
        }
    }

    /// Return the session's CSRF token, minting one if the session predates
    /// the token (tokens are per session, not per request).
    pub async fn csrf_token(&self, ctx: &AuthContext) -> String {
        if let Some(token) = &ctx.record.csrf_token {
            return token.clone();
        }
        let token = csrf::generate_token();
        let mut record = ctx.record.clone();
        record.csrf_token = Some(token.clone());
        self.sessions.put(&ctx.session_id, record).await;
        token
    }

    /// Enforce CSRF on a state-mutating request. The token may arrive in the
    /// `X-CSRF-Token` header or as a `csrf_token` body field.
    pub fn require_csrf(
        &self,
        ctx: &AuthContext,
        headers: &HeaderMap,
        body_token: Option<&str>,
    ) -> Result<(), AuthError> {
        let Some(expected) = ctx.record.csrf_token.as_deref() else {
            return Err(AuthError::InvalidCsrfToken);
        };
        let supplied = headers
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .or(body_token);
        match supplied {
            Some(token) if csrf::validate_token(expected, token) => Ok(()),
            _ => Err(AuthError::InvalidCsrfToken),
        }
    }

    /// Tenants the user may hold as current tenant right now: every
    /// available tenant for admins, membership tenants for everyone else.
    pub async fn available_tenants(&self, user: &User) -> Result<Vec<Tenant>, AuthError> {
        if user.role == UserRole::Admin {
            let tenants = self.store.list_tenants().await?;
            return Ok(tenants
                .into_iter()
                .filter(Tenant::is_available)
                .collect());
        }
        let memberships = self.store.memberships_for_user(user.id).await?;
        let mut tenants = Vec::with_capacity(memberships.len());
        for membership in memberships {
            if let Some(tenant) = self.store.get_tenant(membership.tenant_id).await? {
                if tenant.is_available() {
                    tenants.push(tenant);
                }
            }
        }
        Ok(tenants)
    }

    /// Resolve an explicitly requested `tenant_code` at login. Runs only
    /// after credentials verified, so reporting `invalid_tenant` here leaks
    /// nothing to unauthenticated callers.
    async fn resolve_requested_tenant(
        &self,
        user: &User,
        code: &str,
    ) -> Result<Tenant, AuthError> {
        let tenant = self
            .store
            .get_tenant_by_code(code)
            .await?
            .filter(Tenant::is_available)
            .ok_or(AuthError::InvalidTenant)?;
        if user.role != UserRole::Admin {
            let membership = self.store.membership(user.id, tenant.id).await?;
            if membership.is_none() {
                return Err(AuthError::InvalidTenant);
            }
        }
        Ok(tenant)
    }

    /// Pick the default tenant when login omits `tenant_code`: the first
    /// available membership tenant, falling back for admins to the first
    /// active tenant in the system.
    async fn resolve_default_tenant(&self, user: &User) -> Result<Tenant, AuthError> {
        let memberships = self.store.memberships_for_user(user.id).await?;
        for membership in memberships {
            if let Some(tenant) = self.store.get_tenant(membership.tenant_id).await? {
                if tenant.is_available() {
                    return Ok(tenant);
                }
            }
        }
        if user.role == UserRole::Admin {
            let tenants = self.store.list_tenants().await?;
            if let Some(tenant) = tenants.into_iter().find(Tenant::is_available) {
                return Ok(tenant);
            }
        }
        Err(AuthError::InvalidTenant)
    }
}
