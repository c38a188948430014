use argon2::{
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::auth::errors::AuthError;
use crate::config::HashConfig;

/// Argon2id hashing with configurable cost.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(cfg: &HashConfig) -> Result<Self, AuthError> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| {
                error!(error = %e, "invalid argon2 parameters");
                AuthError::Hashing(e.to_string())
            })?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AuthError::Hashing(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// `Ok(false)` on mismatch. A hash that cannot be parsed is an error, not a
    /// failed login.
    pub fn verify(&self, hash: &str, plain: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            AuthError::Hashing(e.to_string())
        })?;
        // Cost is read from the PHC string, so hashes made under older params still verify.
        match self.argon2().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify_password error");
                Err(AuthError::Hashing(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn cheap_hasher() -> PasswordHasher {
    PasswordHasher::new(&HashConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .expect("minimal argon2 params are valid")
}
