//! Password verification port and its Argon2id implementation.

use std::sync::OnceLock;

use argon2::{Argon2, PasswordHash, PasswordHasher, password_hash::SaltString};
use rand::rngs::OsRng;
use thiserror::Error;

/// Wraps the external hashing primitive.
///
/// A stored hash that cannot be parsed never verifies.
pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool;

    /// Called when no account matches the login. Must cost about as much as
    /// `verify` so response time does not reveal which logins exist.
    /// Always `false`.
    fn verify_missing(&self, plaintext: &str) -> bool {
        let _ = plaintext;
        false
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(String);

/// Argon2id with default parameters, PHC string format.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2PasswordVerifier;

impl Argon2PasswordVerifier {
    /// Hashes the stand-in password up front so the first unknown login is
    /// not slower than later ones.
    pub fn new() -> Self {
        let _ = missing_account_hash();
        Self
    }
}

impl PasswordVerifier for Argon2PasswordVerifier {
    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        argon2::PasswordVerifier::verify_password(&Argon2::default(), plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    fn verify_missing(&self, plaintext: &str) -> bool {
        if let Some(hash) = missing_account_hash() {
            let _ = self.verify(plaintext, hash);
        }
        false
    }
}

fn missing_account_hash() -> Option<&'static str> {
    static HASH: OnceLock<Option<String>> = OnceLock::new();
    HASH.get_or_init(|| hash_password("credo-missing-account").ok())
        .as_deref()
}

/// Hash a password for storage (seeding, account provisioning).
pub fn hash_password(plaintext: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordHashError(e.to_string()))
}
