use argon2::{
    Argon2, PasswordHasher, PasswordVerifier,
    password_hash::{PasswordHash as PhcString, SaltString},
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const PASSWORD_SALT_LEN: usize = 16;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing password failed: {0}")]
pub struct PasswordHashError(argon2::password_hash::Error);

/// Argon2id digest of a password in PHC string form.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes `password` with a fresh random salt. This is CPU bound and must
    /// not run while a store lock is held.
    pub fn generate(password: &str) -> Result<Self, PasswordHashError> {
        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordHashError)?;

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(Self(hash.to_string()))
    }

    /// Checks `password` against this hash. The digest comparison inside the
    /// argon2 verifier is constant-time.
    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        let Ok(parsed) = PhcString::new(&self.0) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    #[must_use]
    pub fn as_phc_str(&self) -> &str {
        &self.0
    }
}

impl Debug for PasswordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordHash").field(&"[redacted]").finish()
    }
}
