// server/src/services/auth.rs

//! Password hashing and verification.

use crate::errors::AppError;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use tracing::{debug, error, instrument};

/// Hashes a plain-text password using Argon2 with a random salt.
#[instrument(name = "auth::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  let argon2_hasher = Argon2::default();

  match argon2_hasher.hash_password(password.as_bytes(), &salt) {
    Ok(password_hash_obj) => Ok(password_hash_obj.to_string()),
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing process failed: {}", argon_err)))
    }
  }
}

/// Verifies a plain-text password against a stored Argon2 hash. Returns
/// `Ok(false)` on a plain mismatch; errors only for malformed hashes or
/// internal verifier failures.
#[instrument(name = "auth::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool, AppError> {
  if hashed_password_str.is_empty() {
    return Err(AppError::Auth("Invalid stored password format.".to_string()));
  }
  if provided_password.is_empty() {
    return Err(AppError::Auth("Password is required.".to_string()));
  }

  let parsed_hash = match PasswordHash::new(hashed_password_str) {
    Ok(ph) => ph,
    Err(parse_err) => {
      error!(error = %parse_err, "Failed to parse stored password hash string.");
      return Err(AppError::Internal(format!("Invalid stored password hash format: {}", parse_err)));
    }
  };

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification encountered an error.");
      Err(AppError::Internal(format!("Password verification process failed: {}", other_argon_err)))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_and_verify_round_trip() {
    let hash = hash_password("correct horse battery staple").unwrap();
    assert!(verify_password(&hash, "correct horse battery staple").unwrap());
    assert!(!verify_password(&hash, "wrong password").unwrap());
  }

  #[test]
  fn empty_password_is_rejected() {
    assert!(hash_password("").is_err());
  }
}
