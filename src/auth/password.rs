//! Password hashing and verification.
//!
//! # Purpose
//! Wraps Argon2id (PHC string format) for the login and user-creation flows.
//!
//! # Security considerations
//! - Verification cost is paid even for unknown identifiers: `login` runs
//!   [`verify_password`] against a fixed dummy hash so response timing does
//!   not reveal whether the identifier exists.
//! - Plaintext passwords are never logged; errors carry no password data.
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::OnceLock;

/// Hash a plaintext password into a PHC-format Argon2id string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verify a plaintext password against a stored PHC hash. Malformed hashes
/// verify as false rather than erroring; a corrupt row must not be
/// distinguishable from a wrong password.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Burn the same Argon2 work as a real verification, against a throwaway
/// hash. Called when the login identifier does not resolve to a user.
pub fn dummy_verify(password: &str) {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    let hash = DUMMY_HASH.get_or_init(|| {
        hash_password("timing-equalizer").unwrap_or_else(|_| String::new())
    });
    let _ = verify_password(password, hash);
}
