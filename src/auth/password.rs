//! Password hashing and verification using Argon2
//!
//! Uses argon2id with a fresh random salt per hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::ChorusError;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Hash a password using Argon2id
///
/// Returns the PHC-formatted hash string that includes the salt and parameters.
pub fn hash_password(password: &str) -> Result<String, ChorusError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ChorusError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ChorusError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| ChorusError::Internal(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`]
pub fn check_password_strength(password: &str) -> Result<(), ChorusError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ChorusError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
