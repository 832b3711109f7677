//! Credential hashing using Argon2
//!
//! The store only ever sees the output of a [`PasswordHasher`]; it never
//! derives or inspects the value itself.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};
use std::fmt::Debug;

use crate::domain::DomainError;

/// Capability for turning a plain password into a stored credential and
/// checking a candidate against it
pub trait PasswordHasher: Send + Sync + Debug {
    /// Hash a password
    fn hash(&self, password: &str) -> Result<String, DomainError>;

    /// Verify a password against a stored hash. Malformed hashes never match.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Argon2id hasher with the crate's default parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::internal(format!("Failed to hash password: {}", e)))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{validate_password, MAX_PASSWORD_LENGTH};

    #[test]
    fn test_hash_and_verify() {
        let hasher = Argon2Hasher::new();

        let hash = hasher.hash("correct horse battery").unwrap();

        assert!(hasher.verify("correct horse battery", &hash));
        assert!(!hasher.verify("wrong horse battery", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = Argon2Hasher::new();

        let first = hasher.hash("secret-password").unwrap();
        let second = hasher.hash("secret-password").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("secret-password", &first));
        assert!(hasher.verify("secret-password", &second));
    }

    #[test]
    fn test_hash_fits_stored_column() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash(&"p".repeat(MAX_PASSWORD_LENGTH)).unwrap();

        assert!(hash.len() <= MAX_PASSWORD_LENGTH);
        assert!(validate_password(&hash).is_ok());
    }

    #[test]
    fn test_verify_malformed_hash() {
        let hasher = Argon2Hasher::new();

        assert!(!hasher.verify("password", "plain-text-not-a-hash"));
        assert!(!hasher.verify("password", ""));
    }
}
