//! User/tenant membership rows.
//!
//! # Purpose
//! Defines the many-to-many association between users and tenants. The set of
//! membership rows for a special user is exactly the set of tenants it may
//! switch into; extra permissions are additive on top of the role table for
//! that tenant only and never escalate the role.
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TenantMembership {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    /// Additional dot-namespaced permissions granted within this tenant.
    #[serde(default)]
    pub extra_permissions: Vec<String>,
}

impl TenantMembership {
    pub fn new(user_id: Uuid, tenant_id: Uuid) -> Self {
        Self {
            user_id,
            tenant_id,
            extra_permissions: Vec::new(),
        }
    }
}
