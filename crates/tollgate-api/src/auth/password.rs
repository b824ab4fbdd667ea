/// Password hashing and verification using Argon2id
///
/// Implements secure password hashing following OWASP recommendations:
/// - Algorithm: Argon2id (memory-hard, resistant to GPU attacks)
/// - Memory: 64 MB
/// - Iterations: 3
/// - Parallelism: 4 threads
/// - Salt: 16 bytes random, fresh per hash
/// - Output: 32 bytes hash
///
/// Digests are PHC strings, so the salt and cost parameters travel with the
/// hash and verification needs nothing else.
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2, Params,
};
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Password hashing configuration
///
/// These parameters are tuned for security while maintaining acceptable performance.
/// Increasing memory or iterations improves security but slows down hashing.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (threads, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    /// Minimal cost parameters so test suites stay fast
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    /// Create Argon2 parameters from this configuration
    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

/// Argon2id password hasher
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher {
    config: PasswordConfig,
}

impl PasswordHasher {
    pub fn new(config: PasswordConfig) -> Self {
        Self { config }
    }

    /// Hash a plaintext password
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - PHC string format hash (includes algorithm, parameters, salt, and hash)
    /// * `Err(PasswordError)` - If hashing fails
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tollgate_api::auth::password::PasswordHasher;
    ///
    /// let hash = PasswordHasher::default().hash("pw1").expect("Failed to hash password");
    /// // Output: $argon2id$v=19$m=65536,t=3,p=4$...
    /// println!("Hash: {}", hash);
    /// ```
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let params = self.config.to_params()?;
        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    /// Verify a plaintext password against a stored hash
    ///
    /// The comparison is constant-time.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Password matches
    /// * `Ok(false)` - Password does not match
    /// * `Err(PasswordError)` - If the stored hash cannot be parsed or used
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

        // Parameters and salt come from the parsed hash
        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(PasswordConfig::for_testing())
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hasher = hasher();
        let hash = hasher.hash("pw1").expect("Failed to hash password");

        assert!(hasher.verify("pw1", &hash).expect("Verification failed"));
        assert!(!hasher.verify("pw2", &hash).expect("Verification failed"));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        // Due to random salt, same password should produce different hashes
        let hasher = hasher();
        let hash1 = hasher.hash("SamePassword").unwrap();
        let hash2 = hasher.hash("SamePassword").unwrap();

        assert_ne!(hash1, hash2);
        assert!(hasher.verify("SamePassword", &hash1).unwrap());
        assert!(hasher.verify("SamePassword", &hash2).unwrap());
    }

    #[test]
    fn test_hash_does_not_contain_plaintext() {
        let hash = hasher().hash("hunter2-plaintext").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("hunter2-plaintext"));
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = hasher().verify("password", "invalid-hash-format");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_verify_uses_parameters_from_hash() {
        let config = PasswordConfig {
            memory_cost: 2048,
            time_cost: 2,
            parallelism: 1,
            output_len: Some(32),
        };
        let hash = PasswordHasher::new(config).hash("TestPassword").unwrap();

        assert!(hash.contains("m=2048"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=1"));

        // A hasher with different settings still verifies it
        assert!(hasher().verify("TestPassword", &hash).unwrap());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let config = PasswordConfig {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 1,
            output_len: Some(32),
        };
        let result = PasswordHasher::new(config).hash("pw");
        assert!(matches!(result, Err(PasswordError::HashingFailed(_))));
    }
}
