//! Argon2 password hashing.

use crate::error::AppError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::{debug, error, instrument};

/// Hashes and verifies passwords with Argon2id. Cost parameters are configurable so tests can
/// use a cheap setting.
#[derive(Clone, Debug)]
pub struct Passwords {
    params: Params,
}

impl Default for Passwords {
    fn default() -> Self {
        Passwords {
            params: Params::default(),
        }
    }
}

impl Passwords {
    pub fn with_params(params: Params) -> Self {
        Passwords { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// PHC-format hash with a fresh random salt.
    #[instrument(name = "passwords::hash", skip_all, err(Display))]
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        if password.is_empty() {
            return Err(AppError::Validation("password is required".into()));
        }
        let salt = SaltString::generate(&mut OsRng);
        match self.argon2().hash_password(password.as_bytes(), &salt) {
            Ok(hash) => Ok(hash.to_string()),
            Err(e) => {
                error!(error = %e, "argon2 hashing failed");
                Err(AppError::Internal(format!("password hashing failed: {}", e)))
            }
        }
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    #[instrument(name = "passwords::verify", skip_all, err(Display))]
    pub fn verify(&self, stored_hash: &str, password: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| AppError::Internal(format!("invalid stored password hash: {}", e)))?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                debug!("password mismatch");
                Ok(false)
            }
            Err(e) => Err(AppError::Internal(format!("password verification failed: {}", e))),
        }
    }
}
