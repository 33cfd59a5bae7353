use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{Error, Result};

const ARGON2_MEMORY: u32 = 19 * 1024; // 19MiB
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;

/// Well-formed digest at the current parameters that no password matches.
/// Verifying against it costs the same as a real check, so logins for
/// unknown usernames take as long as wrong passwords.
pub const UNKNOWN_USER_DIGEST: &str = "$argon2id$v=19$m=19456,t=2,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// One-way password hashing with Argon2id.
///
/// Digests are PHC strings (`$argon2id$v=19$m=...`), so the algorithm and
/// its parameters travel with each digest and older digests keep verifying
/// after the parameters here change.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(
            ARGON2_MEMORY,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        )
        .unwrap_or_default();

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hashes a plaintext password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::PasswordHash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Checks a plaintext password against a stored digest.
    ///
    /// Any failure, including an unparseable digest, yields `false`.
    #[must_use]
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Rejecting malformed password digest: {e}");
                return false;
            }
        };

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                tracing::warn!("Password verification failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::PasswordHasher as _;

    #[test]
    fn test_hash_is_phc_format() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("secret").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("secret"));
    }

    #[test]
    fn test_verify_correct_and_wrong_password() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("admin123").unwrap();

        assert!(hasher.verify("admin123", &hash));
        assert!(!hasher.verify("admin124", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = PasswordHasher::new();
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();

        assert_ne!(a, b);
        assert!(hasher.verify("same", &a));
        assert!(hasher.verify("same", &b));
    }

    #[test]
    fn test_malformed_digest_fails_closed() {
        let hasher = PasswordHasher::new();

        assert!(!hasher.verify("anything", ""));
        assert!(!hasher.verify("anything", "not-a-phc-string"));
        assert!(!hasher.verify("anything", "$argon2id$v=19$garbage"));
    }

    #[test]
    fn test_unknown_user_digest_runs_full_check() {
        let parsed = PasswordHash::new(UNKNOWN_USER_DIGEST).unwrap();
        assert_eq!(parsed.params.get_decimal("m"), Some(ARGON2_MEMORY));
        assert_eq!(parsed.params.get_decimal("t"), Some(ARGON2_ITERATIONS));
        assert_eq!(parsed.params.get_decimal("p"), Some(ARGON2_PARALLELISM));
        assert_eq!(parsed.hash.as_ref().map(|h| h.len()), Some(ARGON2_OUTPUT_LEN));

        // A mismatch, not a parse or parameter error
        let hasher = PasswordHasher::new();
        assert!(matches!(
            hasher.argon2.verify_password(b"admin123", &parsed),
            Err(argon2::password_hash::Error::Password)
        ));
        assert!(!hasher.verify("admin123", UNKNOWN_USER_DIGEST));
        assert!(!hasher.verify("", UNKNOWN_USER_DIGEST));
    }

    #[test]
    fn test_verifies_digest_with_other_parameters() {
        let legacy = Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(8 * 1024, 1, 1, None).unwrap(),
        );
        let salt = SaltString::generate(&mut OsRng);
        let digest = legacy
            .hash_password(b"old-password", &salt)
            .unwrap()
            .to_string();

        assert!(PasswordHasher::new().verify("old-password", &digest));
    }
}
