//! Password hashing utilities
//!
//! Argon2id with a fresh random salt per digest. Digests are PHC strings
//! (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`), so the parameters used for a
//! stored digest travel with it and verification keeps working after the
//! configured cost changes.

use argon2::password_hash::{Error as ArgonError, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand_core::OsRng;
use tracing::error;

use crate::domain::{DomainError, DomainResult};

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    /// OWASP recommendation: 19 MiB, 2 passes, 1 lane.
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    pub fn new(params: HashingParams) -> DomainResult<Self> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| DomainError::Hashing(format!("invalid argon2 parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password into a storable digest.
    pub fn hash(&self, password: &str) -> DomainResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|digest| digest.to_string())
            .map_err(|e| {
                error!(error = %e, "Password hashing failed");
                DomainError::Hashing(e.to_string())
            })
    }

    /// Check a plaintext password against a stored digest.
    ///
    /// A mismatch is `Ok(false)`; a digest that cannot be parsed is a server fault.
    pub fn verify(&self, password: &str, stored_hash: &str) -> DomainResult<bool> {
        let parsed = PasswordHash::new(stored_hash).map_err(|e| {
            error!(error = %e, "Stored password digest is not a valid PHC string");
            DomainError::Hashing(format!("unreadable stored digest: {}", e))
        })?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(ArgonError::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "Password verification failed");
                Err(DomainError::Hashing(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> CredentialHasher {
    CredentialHasher::new(HashingParams {
        memory_kib: 256,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}
