// ABOUTME: Cryptographically random opaque token generation backed by the system RNG
// ABOUTME: Produces URL-safe base64 strings for access tokens, refresh tokens, and codes
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use base64::{engine::general_purpose, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::error;

use crate::errors::OAuthError;

/// 256 bits of entropy per token
const TOKEN_BYTES: usize = 32;

/// Generate a random opaque token as URL-safe base64 without padding
///
/// # Errors
/// Returns `server_error` if the system RNG fails; the server cannot issue
/// tokens securely without a working RNG
pub fn generate_random_token() -> Result<String, OAuthError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; TOKEN_BYTES];

    rng.fill(&mut bytes).map_err(|e| {
        error!(
            "CRITICAL: SystemRandom failed - cannot generate secure random bytes: {}",
            e
        );
        OAuthError::server_error("system RNG failure - cannot generate token")
    })?;

    Ok(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_sized() {
        let token = generate_random_token().unwrap();
        // 32 bytes -> 43 base64url characters, no padding
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let a = generate_random_token().unwrap();
        let b = generate_random_token().unwrap();
        assert_ne!(a, b);
    }
}
