// server/src/services/auth_service.rs

//! Admin key hashing and verification for the protected order actions.

use crate::errors::AppError;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use tracing::{debug, error, instrument};

/// Hashes an admin key into an Argon2 PHC string suitable for `ADMIN_KEY_HASH`.
#[instrument(name = "auth_service::hash_admin_key", skip(key), err(Display))]
pub fn hash_admin_key(key: &str) -> Result<String, AppError> {
  if key.trim().is_empty() {
    return Err(AppError::Validation("Admin key cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(key.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 admin key hashing failed.");
      AppError::Internal(format!("Admin key hashing failed: {}", argon_err))
    })
}

/// Checks a presented key against the stored hash.
///
/// `Ok(false)` on mismatch; an unparsable stored hash is an internal error.
#[instrument(
  name = "auth_service::verify_admin_key",
  skip(stored_hash, presented),
  err(Display),
  fields(hash_len = stored_hash.len())
)]
pub fn verify_admin_key(stored_hash: &str, presented: &str) -> Result<bool, AppError> {
  if presented.is_empty() {
    return Ok(false);
  }
  let parsed_hash = PasswordHash::new(stored_hash).map_err(|parse_err| {
    error!(error = %parse_err, "Stored admin key hash is not a valid PHC string.");
    AppError::Internal(format!("Invalid ADMIN_KEY_HASH: {}", parse_err))
  })?;

  match Argon2::default().verify_password(presented.as_bytes(), &parsed_hash) {
    Ok(()) => {
      debug!("Admin key verified.");
      Ok(true)
    }
    Err(argon2::password_hash::Error::Password) => {
      debug!("Admin key mismatch.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 admin key verification encountered an error.");
      Err(AppError::Internal(format!(
        "Admin key verification failed: {}",
        other_argon_err
      )))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hashed_key_verifies_and_others_do_not() {
    let hash = hash_admin_key("counter-staff-key").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_admin_key(&hash, "counter-staff-key").unwrap());
    assert!(!verify_admin_key(&hash, "guess").unwrap());
    assert!(!verify_admin_key(&hash, "").unwrap());
  }

  #[test]
  fn empty_key_and_bad_hash_are_rejected() {
    assert!(matches!(hash_admin_key("  "), Err(AppError::Validation(_))));
    assert!(matches!(verify_admin_key("not-a-hash", "key"), Err(AppError::Internal(_))));
  }
}
