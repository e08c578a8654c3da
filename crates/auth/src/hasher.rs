//! Password digest strategies.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::DEFAULT_PASSWORD_SALT;

/// Turns a plaintext password into a stored digest.
///
/// Implementations must be deterministic and free of side effects: the same
/// plaintext always yields the same digest, across calls and process
/// restarts. The strategy is injected into the authenticator at construction
/// time, so a slow adaptive hash (argon2, bcrypt) can replace the default
/// without touching callers; such strategies embed per-hash parameters in
/// the digest and must override [`verify`](PasswordHasher::verify).
pub trait PasswordHasher: Send + Sync {
    /// Digest a plaintext password.
    fn hash(&self, plaintext: &str) -> String;

    /// Compare a plaintext against a stored digest.
    ///
    /// The default recomputes the digest and compares in constant time,
    /// which is correct only for deterministic strategies.
    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        constant_time_eq(self.hash(plaintext).as_bytes(), digest.as_bytes())
    }
}

/// Length-safe constant-time byte comparison.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Default strategy: two rounds of SHA-256 over `plaintext + salt`, each
/// round lowercase-hex encoded (the second round digests the first round's
/// hex string).
///
/// This is a fast digest, not an adaptive one. Deployments that want argon2
/// or bcrypt implement [`PasswordHasher`] over those and override `verify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltedDigest {
    salt: String,
}

impl SaltedDigest {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }
}

impl Default for SaltedDigest {
    fn default() -> Self {
        Self::new(DEFAULT_PASSWORD_SALT)
    }
}

impl PasswordHasher for SaltedDigest {
    fn hash(&self, plaintext: &str) -> String {
        let first = hex_sha256(format!("{plaintext}{}", self.salt).as_bytes());
        hex_sha256(first.as_bytes())
    }
}

/// Lowercase hex SHA-256 of raw bytes. Also used to derive stable slugs for
/// ad-hoc grants.
pub(crate) fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_across_processes() {
        // Fixed vector: sha256 applied twice to "secret" + default salt.
        let hasher = SaltedDigest::default();
        assert_eq!(
            hasher.hash("secret"),
            "be838cd735aeac0a65c8cc979442879ccd80496066f4b377c1f949ef61d86e96"
        );
    }

    #[test]
    fn digest_covers_both_rounds() {
        let hasher = SaltedDigest::default();
        let first = hex_sha256(b"secretwardgate");
        assert_eq!(hasher.hash("secret"), hex_sha256(first.as_bytes()));
        assert_ne!(hasher.hash("secret"), first);
    }

    #[test]
    fn salt_changes_the_digest() {
        let a = SaltedDigest::default().hash("secret");
        let b = SaltedDigest::new("pepper").hash("secret");
        assert_ne!(a, b);
        assert_eq!(
            b,
            "332b4b27e43a6ec83f2361c61a69b7c2c819053e80bac39ca291e815386bfccb"
        );
    }

    #[test]
    fn verify_accepts_matching_plaintext_only() {
        let hasher = SaltedDigest::default();
        let digest = hasher.hash("secret");
        assert!(hasher.verify("secret", &digest));
        assert!(!hasher.verify("Secret", &digest));
        assert!(!hasher.verify("", &digest));
    }

    #[test]
    fn constant_time_eq_handles_length_mismatch() {
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn strategies_are_swappable() {
        struct Reversed;
        impl PasswordHasher for Reversed {
            fn hash(&self, plaintext: &str) -> String {
                plaintext.chars().rev().collect()
            }
        }

        let hasher = Reversed;
        assert_eq!(hasher.hash("abc"), "cba");
        assert!(hasher.verify("abc", "cba"));
        assert!(!hasher.verify("abc", "abc"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: hashing is deterministic for any plaintext and salt.
            #[test]
            fn hash_is_deterministic(plaintext in ".{0,64}", salt in ".{0,16}") {
                let a = SaltedDigest::new(salt.clone()).hash(&plaintext);
                let b = SaltedDigest::new(salt).hash(&plaintext);
                prop_assert_eq!(a, b);
            }

            /// Property: verify accepts exactly what hash produced.
            #[test]
            fn verify_round_trips(plaintext in ".{0,64}") {
                let hasher = SaltedDigest::default();
                let digest = hasher.hash(&plaintext);
                prop_assert!(hasher.verify(&plaintext, &digest));
            }
        }
    }
}
