//! Role permission tables and grant evaluation.
//!
//! # Purpose
//! Permissions are dot-namespaced strings (`file.delete`, `tenants.create`)
//! granted by static role-keyed tables. Membership rows may add extra
//! permissions for one tenant, but the tables themselves are not editable at
//! runtime and overrides never change the role.
//!
//! # Grant rules
//! - `*` grants everything.
//! - `<ns>.*` grants every action in that namespace.
//! - Otherwise the grant must match exactly.
use crate::model::UserRole;

/// Static permission table for a role.
pub fn role_permissions(role: UserRole) -> &'static [&'static str] {
    match role {
        UserRole::Admin => &["*"],
        UserRole::SpecialUser => &[
            "file.view",
            "file.upload",
            "file.delete",
            "chat.send",
            "calendar.view",
            "calendar.edit",
            "task.view",
            "task.edit",
            "tenants.view",
        ],
        UserRole::StandardUser => &[
            "file.view",
            "file.upload",
            "chat.send",
            "calendar.view",
            "task.view",
        ],
    }
}

/// Whether a single grant string covers the requested permission.
fn grant_covers(grant: &str, requested: &str) -> bool {
    if grant == "*" {
        return true;
    }
    if let Some(namespace) = grant.strip_suffix(".*") {
        return requested
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with('.'));
    }
    grant == requested
}

/// Evaluate a permission against the role table plus membership overrides.
pub fn is_granted(role: UserRole, extra: &[String], requested: &str) -> bool {
    role_permissions(role)
        .iter()
        .any(|grant| grant_covers(grant, requested))
        || extra.iter().any(|grant| grant_covers(grant, requested))
}
