//! Tenant records.
//!
//! # Purpose
//! Defines the tenant shape used by the store and HTTP API. Tenants are
//! soft-deleted via `deleted_at`; a tenant is only usable as a session's
//! current tenant while it is active and not soft-deleted.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(TenantStatus::Active),
            "suspended" => Some(TenantStatus::Suspended),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Tenant {
    pub id: Uuid,
    /// Short unique code used as a login discriminator (`tenant_code`).
    pub code: String,
    pub name: String,
    pub status: TenantStatus,
    pub storage_quota_bytes: i64,
    pub tier: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tenant {
    /// Whether this tenant may be used as a session's current tenant.
    pub fn is_available(&self) -> bool {
        self.status == TenantStatus::Active && self.deleted_at.is_none()
    }
}
