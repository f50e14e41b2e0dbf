//! CSRF token minting and validation.
//!
//! # Purpose
//! Sessions hold one anti-forgery token, minted at login (or on explicit
//! refresh) rather than per request so a page's parallel AJAX calls share
//! one value. State-mutating handlers require it via the guard.
//!
//! # Security considerations
//! - Tokens are 32 bytes from the OS RNG, hex-encoded.
//! - Comparison is constant-time; length mismatches short-circuit, which is
//!   fine because the token length is public.
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

const TOKEN_BYTES: usize = 32;

/// Mint a fresh CSRF token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Constant-time comparison of a supplied token against the session value.
pub fn validate_token(expected: &str, supplied: &str) -> bool {
    if expected.is_empty() || expected.len() != supplied.len() {
        return false;
    }
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_validates() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(validate_token(&token, &token));
    }

    #[test]
    fn any_other_string_fails() {
        let token = generate_token();
        assert!(!validate_token(&token, &generate_token()));
        assert!(!validate_token(&token, ""));
        assert!(!validate_token(&token, &token[1..]));
    }

    #[test]
    fn empty_expected_never_validates() {
        assert!(!validate_token("", ""));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }
}
