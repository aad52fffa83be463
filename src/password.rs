//! Password hashing and verification using Argon2id.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

// 16-byte salt and 32-byte all-zero output, B64 without padding.
const DUMMY_SALT: &str = "YWdvcmEtbm8tYWNjb3VudA";
const DUMMY_OUTPUT: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    pub memory_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for Credentials {
    /// 64 MiB, 4 passes, single lane.
    fn default() -> Self {
        Self { memory_kib: 1 << 16, time_cost: 4, parallelism: 1 }
    }
}

impl Credentials {
    fn argon2(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_kib, self.time_cost, self.parallelism, None)
            .map_err(|e| PasswordError::Hashing(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a plaintext password into a PHC string safe for storage.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// A well-formed PHC string with this instance's cost parameters that no
    /// password matches. Verifying against it costs the same as a real check,
    /// so logins for unknown accounts take as long as wrong passwords.
    pub fn dummy_hash(&self) -> String {
        format!(
            "$argon2id$v=19$m={},t={},p={}${DUMMY_SALT}${DUMMY_OUTPUT}",
            self.memory_kib, self.time_cost, self.parallelism
        )
    }

    /// Constant-time check of `password` against a stored PHC string.
    ///
    /// A malformed hash and a wrong password are both plain `false`.
    /// Parameters are read from the PHC string, so hashes created under
    /// different cost settings still verify.
    pub fn verify(&self, password_hash: &str, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(password_hash) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };
        Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
    }
}
