// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing with Argon2id.
//!
//! Verifiers are PHC strings (`$argon2id$v=19$...`) carrying their own salt
//! and parameters, so [`verify`] needs nothing but the stored string.
//!
//! Argon2id is deliberately slow. Async callers use [`hash_async`] and
//! [`verify_async`], which run on the blocking thread pool.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use ring::rand::{SecureRandom, SystemRandom};

const SALT_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password must not be empty")]
    EmptyPassword,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

fn salt() -> Result<SaltString, PasswordError> {
    let mut bytes = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| PasswordError::Hashing("system random unavailable".to_string()))?;
    SaltString::encode_b64(&bytes).map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash(password: &str) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::EmptyPassword);
    }
    Argon2::default()
        .hash_password(password.as_bytes(), &salt()?)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Check a plaintext password against a stored verifier.
///
/// Malformed verifiers simply fail to match.
pub fn verify(password: &str, verifier: &str) -> bool {
    PasswordHash::new(verifier)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// [`hash`] on the blocking thread pool.
pub async fn hash_async(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash(&password))
        .await
        .map_err(|e| PasswordError::Hashing(e.to_string()))?
}

/// [`verify`] on the blocking thread pool. A failed task never matches.
pub async fn verify_async(password: String, verifier: String) -> bool {
    tokio::task::spawn_blocking(move || verify(&password, &verifier))
        .await
        .unwrap_or(false)
}
