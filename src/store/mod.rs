//! Storage abstraction for users, tenants, and memberships.
//!
//! # Purpose
//! The guard never issues SQL directly; it consumes this trait. Two backends
//! exist: an in-memory map store for development and tests, and a durable
//! Postgres store.
use crate::model::{Tenant, TenantMembership, TenantStatus, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Look up a user by username or email. Identifier matching is exact;
    /// the caller decides how to react to a miss (login must not leak which
    /// of identifier/password was wrong).
    async fn find_user_by_identifier(&self, identifier: &str) -> StoreResult<Option<User>>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Create a user; conflicts on duplicate username or email.
    async fn create_user(&self, user: User) -> StoreResult<User>;
    /// Create a user and attach memberships as one unit: either the user
    /// exists with every membership, or nothing was written.
    async fn create_user_with_memberships(
        &self,
        user: User,
        memberships: Vec<TenantMembership>,
    ) -> StoreResult<User>;

    async fn get_tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>>;
    async fn get_tenant_by_code(&self, code: &str) -> StoreResult<Option<Tenant>>;
    /// All tenants that are not soft-deleted, in code order.
    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>>;
    /// Create a tenant; conflicts on duplicate code.
    async fn create_tenant(&self, tenant: Tenant) -> StoreResult<Tenant>;
    async fn set_tenant_status(&self, id: Uuid, status: TenantStatus) -> StoreResult<Tenant>;
    /// Soft delete: stamps `deleted_at`, never removes the row.
    async fn soft_delete_tenant(&self, id: Uuid, when: DateTime<Utc>) -> StoreResult<()>;

    async fn memberships_for_user(&self, user_id: Uuid) -> StoreResult<Vec<TenantMembership>>;
    async fn membership(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> StoreResult<Option<TenantMembership>>;
    async fn add_membership(&self, membership: TenantMembership) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
