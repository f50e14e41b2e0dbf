//! Postgres-backed implementation of the auth store.
//!
//! # What this module is
//! Implements [`AuthStore`] using Postgres (via `sqlx`) as the durable store
//! for users, tenants, and memberships. The guard consumes the trait; this
//! module owns the schema mapping.
//!
//! # Key invariants
//! - Enum-valued columns (`role`, `status`) are stored as `TEXT` and parsed
//!   at the row-mapping boundary; unknown values are surfaced as unexpected
//!   errors rather than silently coerced.
//! - Soft deletes stamp `deleted_at`; no row removal.
//! - Unique violations (username, email, tenant code) map to
//!   [`StoreError::Conflict`].
//!
//! # Operational notes
//! - Migrations run at startup via `sqlx::migrate!("./migrations")`, so
//!   handlers may assume the schema exists.
//! - Pool sizing and acquire timeouts are explicit; the service fails fast
//!   rather than hanging on an unreachable database.
//! - Connection URLs may contain credentials; they are never logged.
use super::{AuthStore, StoreError, StoreResult};
use crate::config::PostgresConfig;
use crate::model::{Tenant, TenantMembership, TenantStatus, User, UserRole, UserStatus};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

pub struct PostgresStore {
    pool: PgPool,
}

/// Row shape for the `users` table.
///
/// DB-facing structs are kept separate from domain types so schema details
/// (column names, text-encoded enums) stay localized to this module.
#[derive(Debug, Clone, FromRow)]
struct DbUser {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl DbUser {
    fn into_user(self) -> StoreResult<User> {
        let role = UserRole::parse(&self.role)
            .ok_or_else(|| StoreError::Unexpected(anyhow!("unknown role: {}", self.role)))?;
        let status = UserStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Unexpected(anyhow!("unknown status: {}", self.status)))?;
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            role,
            status,
            created_at: self.created_at,
        })
    }
}

/// Row shape for the `tenants` table.
#[derive(Debug, Clone, FromRow)]
struct DbTenant {
    id: Uuid,
    code: String,
    name: String,
    status: String,
    storage_quota_bytes: i64,
    tier: String,
    deleted_at: Option<DateTime<Utc>>,
}

impl DbTenant {
    fn into_tenant(self) -> StoreResult<Tenant> {
        let status = TenantStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Unexpected(anyhow!("unknown tenant status: {}", self.status))
        })?;
        Ok(Tenant {
            id: self.id,
            code: self.code,
            name: self.name,
            status,
            storage_quota_bytes: self.storage_quota_bytes,
            tier: self.tier,
            deleted_at: self.deleted_at,
        })
    }
}

/// Row shape for the `tenant_memberships` table.
#[derive(Debug, Clone, FromRow)]
struct DbMembership {
    user_id: Uuid,
    tenant_id: Uuid,
    extra_permissions: Vec<String>,
}

impl DbMembership {
    fn into_membership(self) -> TenantMembership {
        TenantMembership {
            user_id: self.user_id,
            tenant_id: self.tenant_id,
            extra_permissions: self.extra_permissions,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, status, created_at";
const TENANT_COLUMNS: &str = "id, code, name, status, storage_quota_bytes, tier, deleted_at";

impl PostgresStore {
    /// Connect to Postgres and run embedded migrations.
    ///
    /// # Errors
    /// - Connection, pool setup, or migration failures.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        // Bounded pool behavior: `acquire_timeout` makes requests fail fast
        // when the pool is exhausted instead of queueing indefinitely.
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|err| StoreError::Unexpected(err.into()))?;

        Ok(Self { pool })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}

#[async_trait]
impl AuthStore for PostgresStore {
    async fn find_user_by_identifier(&self, identifier: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DbUser::into_user).transpose()
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row =
            sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(DbUser::into_user).transpose()
    }

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let insert = sqlx::query(
            r#"INSERT INTO users (id, username, email, password_hash, role, status, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await;
        match insert {
            Ok(_) => Ok(user),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Conflict("user exists".into()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn create_user_with_memberships(
        &self,
        user: User,
        memberships: Vec<TenantMembership>,
    ) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;
        let insert = sqlx::query(
            r#"INSERT INTO users (id, username, email, password_hash, role, status, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.created_at)
        .execute(&mut *tx)
        .await;
        match insert {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::Conflict("user exists".into()));
            }
            Err(err) => return Err(err.into()),
        }
        for membership in &memberships {
            sqlx::query(
                r#"INSERT INTO tenant_memberships (user_id, tenant_id, extra_permissions)
                   VALUES ($1, $2, $3)"#,
            )
            .bind(membership.user_id)
            .bind(membership.tenant_id)
            .bind(&membership.extra_permissions)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(user)
    }

    async fn get_tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, DbTenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DbTenant::into_tenant).transpose()
    }

    async fn get_tenant_by_code(&self, code: &str) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, DbTenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DbTenant::into_tenant).transpose()
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        let rows = sqlx::query_as::<_, DbTenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE deleted_at IS NULL ORDER BY code"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DbTenant::into_tenant).collect()
    }

    async fn create_tenant(&self, tenant: Tenant) -> StoreResult<Tenant> {
        let insert = sqlx::query(
            r#"INSERT INTO tenants (id, code, name, status, storage_quota_bytes, tier, deleted_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(tenant.id)
        .bind(&tenant.code)
        .bind(&tenant.name)
        .bind(tenant.status.as_str())
        .bind(tenant.storage_quota_bytes)
        .bind(&tenant.tier)
        .bind(tenant.deleted_at)
        .execute(&self.pool)
        .await;
        match insert {
            Ok(_) => Ok(tenant),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Conflict("tenant exists".into()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn set_tenant_status(&self, id: Uuid, status: TenantStatus) -> StoreResult<Tenant> {
        let row = sqlx::query_as::<_, DbTenant>(&format!(
            "UPDATE tenants SET status = $2 WHERE id = $1 AND deleted_at IS NULL
             RETURNING {TENANT_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(DbTenant::into_tenant)
            .transpose()?
            .ok_or_else(|| StoreError::NotFound("tenant".into()))
    }

    async fn soft_delete_tenant(&self, id: Uuid, when: DateTime<Utc>) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE tenants SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .bind(when)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("tenant".into()));
        }
        Ok(())
    }

    async fn memberships_for_user(&self, user_id: Uuid) -> StoreResult<Vec<TenantMembership>> {
        let rows = sqlx::query_as::<_, DbMembership>(
            r#"SELECT user_id, tenant_id, extra_permissions
               FROM tenant_memberships WHERE user_id = $1 ORDER BY tenant_id"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DbMembership::into_membership).collect())
    }

    async fn membership(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> StoreResult<Option<TenantMembership>> {
        let row = sqlx::query_as::<_, DbMembership>(
            r#"SELECT user_id, tenant_id, extra_permissions
               FROM tenant_memberships WHERE user_id = $1 AND tenant_id = $2"#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DbMembership::into_membership))
    }

    async fn add_membership(&self, membership: TenantMembership) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO tenant_memberships (user_id, tenant_id, extra_permissions)
               VALUES ($1, $2, $3)
               ON CONFLICT (user_id, tenant_id)
               DO UPDATE SET extra_permissions = EXCLUDED.extra_permissions"#,
        )
        .bind(membership.user_id)
        .bind(membership.tenant_id)
        .bind(&membership.extra_permissions)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
