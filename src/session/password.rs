//! Argon2id password hashing and verification.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::session::AuthError;

/// Hash a plaintext password with Argon2id and a random salt.
pub fn hash(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Verify a plaintext password against a stored hash.
///
/// `Ok(false)` for a wrong password; errors only for malformed hashes or
/// internal failures.
pub fn verify(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AuthError::Hashing(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hashing(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_verifies() {
        let hashed = hash("hunter2").unwrap();
        assert!(verify("hunter2", &hashed).unwrap());
        assert!(!verify("hunter3", &hashed).unwrap());
    }

    #[test]
    fn salts_are_random() {
        assert_ne!(hash("hunter2").unwrap(), hash("hunter2").unwrap());
    }

    #[test]
    fn malformed_hashes_error_instead_of_matching() {
        assert!(verify("hunter2", "not-a-hash").is_err());
    }
}
