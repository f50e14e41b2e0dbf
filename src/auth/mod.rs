//! Authentication and authorization modules.
//!
//! # Purpose
//! Groups the session store, CSRF handling, password hashing, permission
//! tables, and the request guard that ties them together.
pub mod csrf;
pub mod error;
pub mod guard;
pub mod password;
pub mod permissions;
pub mod session;
