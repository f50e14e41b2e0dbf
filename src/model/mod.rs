//! Domain model for the authorization service.
//!
//! # Purpose
//! Re-exports the user, tenant, and membership records shared by the store,
//! guard, and HTTP API layers.
mod membership;
mod tenant;
mod user;

pub use membership::TenantMembership;
pub use tenant::{Tenant, TenantStatus};
pub use user::{User, UserRole, UserStatus};
