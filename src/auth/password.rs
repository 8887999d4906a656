use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::Arc;

use rand::rngs::OsRng;
use tracing::{error, warn};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) const DUMMY_PASSWORD: &str = "unknown-user-placeholder";

/// First password rule a candidate fails, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least 8 characters long")]
    TooShort,
    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("Password must contain at least one digit")]
    MissingDigit,
}

pub fn check_password_policy(plain: &str) -> Result<(), PasswordPolicyError> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordPolicyError::TooShort);
    }
    if !plain.chars().any(char::is_uppercase) {
        return Err(PasswordPolicyError::MissingUppercase);
    }
    if !plain.chars().any(char::is_lowercase) {
        return Err(PasswordPolicyError::MissingLowercase);
    }
    if !plain.chars().any(char::is_numeric) {
        return Err(PasswordPolicyError::MissingDigit);
    }
    Ok(())
}

/// Argon2id hashing with a configured iteration count.
#[derive(Clone)]
pub struct PasswordHashing {
    params: Params,
    dummy_hash: Arc<str>,
}

impl PasswordHashing {
    pub fn new(iterations: u32) -> anyhow::Result<Self> {
        let params = Params::new(
            Params::DEFAULT_M_COST,
            iterations,
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {e}"))?;
        let hashing = Self {
            params,
            dummy_hash: Arc::from(""),
        };
        let dummy_hash = hashing.hash_password(DUMMY_PASSWORD)?;
        Ok(Self {
            dummy_hash: dummy_hash.into(),
            ..hashing
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash_password(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Parameters are read from the stored hash, so hashes made under an
    /// older cost still verify. A malformed hash never verifies.
    pub fn verify_password(&self, plain: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };
        self.argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }

    /// Runs one full verification at the configured cost against a hash
    /// no login can match. Used when there is no stored hash to check.
    pub fn verify_dummy(&self, plain: &str) {
        let _ = self.verify_password(plain, &self.dummy_hash);
    }
}
