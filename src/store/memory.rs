//! In-memory implementation of the auth store.
//!
//! # Purpose
//! Implements [`AuthStore`] entirely in memory using `HashMap`s guarded by
//! `tokio::sync::RwLock`. It exists for:
//! - local development and tests (no external dependencies)
//! - deployments where durability is not required
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: mutations take write locks, reads take
//!   read locks. Identifier lookups scan the user map, which is fine at the
//!   scale this backend is meant for.
use super::{AuthStore, StoreError, StoreResult};
use crate::model::{Tenant, TenantMembership, TenantStatus, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::gauge;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub struct InMemoryStore {
    /// Authoritative user records keyed by id.
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    /// Authoritative tenant records keyed by id (soft-deleted rows included).
    tenants: Arc<RwLock<HashMap<Uuid, Tenant>>>,
    /// Membership rows keyed by `(user_id, tenant_id)`.
    memberships: Arc<RwLock<HashMap<(Uuid, Uuid), TenantMembership>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            tenants: Arc::new(RwLock::new(HashMap::new())),
            memberships: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthStore for InMemoryStore {
    async fn find_user_by_identifier(&self, identifier: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.username == identifier || user.email == identifier)
            .cloned())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let duplicate = users
            .values()
            .any(|existing| existing.username == user.username || existing.email == user.email);
        if duplicate {
            return Err(StoreError::Conflict("user exists".into()));
        }
        users.insert(user.id, user.clone());
        gauge!("teamgate_users").set(users.len() as f64);
        Ok(user)
    }

    async fn create_user_with_memberships(
        &self,
        user: User,
        new_memberships: Vec<TenantMembership>,
    ) -> StoreResult<User> {
        // Both locks are held across the write so readers never see the user
        // without its memberships.
        let mut users = self.users.write().await;
        let mut memberships = self.memberships.write().await;
        let duplicate = users
            .values()
            .any(|existing| existing.username == user.username || existing.email == user.email);
        if duplicate {
            return Err(StoreError::Conflict("user exists".into()));
        }
        users.insert(user.id, user.clone());
        gauge!("teamgate_users").set(users.len() as f64);
        for membership in new_memberships {
            memberships.insert((membership.user_id, membership.tenant_id), membership);
        }
        Ok(user)
    }

    async fn get_tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>> {
        Ok(self.tenants.read().await.get(&id).cloned())
    }

    async fn get_tenant_by_code(&self, code: &str) -> StoreResult<Option<Tenant>> {
        let tenants = self.tenants.read().await;
        Ok(tenants.values().find(|tenant| tenant.code == code).cloned())
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        let tenants = self.tenants.read().await;
        let mut items: Vec<Tenant> = tenants
            .values()
            .filter(|tenant| tenant.deleted_at.is_none())
            .cloned()
            .collect();
        items.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(items)
    }

    async fn create_tenant(&self, tenant: Tenant) -> StoreResult<Tenant> {
        let mut tenants = self.tenants.write().await;
        if tenants.values().any(|existing| existing.code == tenant.code) {
            return Err(StoreError::Conflict("tenant exists".into()));
        }
        tenants.insert(tenant.id, tenant.clone());
        gauge!("teamgate_tenants").set(tenants.len() as f64);
        Ok(tenant)
    }

    async fn set_tenant_status(&self, id: Uuid, status: TenantStatus) -> StoreResult<Tenant> {
        let mut tenants = self.tenants.write().await;
        let tenant = tenants
            .get_mut(&id)
            .filter(|tenant| tenant.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound("tenant".into()))?;
        tenant.status = status;
        Ok(tenant.clone())
    }

    async fn soft_delete_tenant(&self, id: Uuid, when: DateTime<Utc>) -> StoreResult<()> {
        let mut tenants = self.tenants.write().await;
        let tenant = tenants
            .get_mut(&id)
            .filter(|tenant| tenant.deleted_at.is_none())
            .ok_or_else(|| StoreError::NotFound("tenant".into()))?;
        tenant.deleted_at = Some(when);
        Ok(())
    }

    async fn memberships_for_user(&self, user_id: Uuid) -> StoreResult<Vec<TenantMembership>> {
        let memberships = self.memberships.read().await;
        let mut items: Vec<TenantMembership> = memberships
            .values()
            .filter(|membership| membership.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by_key(|membership| membership.tenant_id);
        Ok(items)
    }

    async fn membership(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> StoreResult<Option<TenantMembership>> {
        let memberships = self.memberships.read().await;
        Ok(memberships.get(&(user_id, tenant_id)).cloned())
    }

    async fn add_membership(&self, membership: TenantMembership) -> StoreResult<()> {
        let mut memberships = self.memberships.write().await;
        memberships.insert((membership.user_id, membership.tenant_id), membership);
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
