//! Cryptographic primitives for Slotguard.
//!
//! Wraps Argon2id password hashing and bootstrap-token generation with
//! strong types.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Random bytes in a bootstrap token.
pub const TOKEN_BYTES: usize = 32;

/// Length of a bootstrap token's hex form.
pub const TOKEN_HEX_LEN: usize = TOKEN_BYTES * 2;

/// Salt length for password hashes.
const SALT_BYTES: usize = 16;

/// One-way password hashing with a per-hash random salt.
///
/// Hashes are PHC strings, so the salt and cost parameters travel with the
/// hash and verification needs nothing else.
#[derive(Clone)]
pub struct PasswordManager {
    argon2: Argon2<'static>,
}

impl PasswordManager {
    /// Argon2id with the library's default cost parameters.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Argon2id with explicit cost parameters.
    ///
    /// `memory_kib` is the memory cost in KiB, `iterations` the time cost and
    /// `lanes` the degree of parallelism.
    pub fn with_params(memory_kib: u32, iterations: u32, lanes: u32) -> Result<Self, CoreError> {
        let params = Params::new(memory_kib, iterations, lanes, None)
            .map_err(|e| CoreError::InvalidParams(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a secret with a fresh random salt.
    pub fn hash(&self, secret: &str) -> Result<String, CoreError> {
        let mut salt_bytes = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| CoreError::Hashing(e.to_string()))?;

        let phc = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| CoreError::Hashing(e.to_string()))?
            .to_string();

        Ok(phc)
    }

    /// Check a secret against a stored hash.
    ///
    /// A malformed hash never matches.
    pub fn verify(&self, secret: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl Default for PasswordManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PasswordManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordManager(argon2id)")
    }
}

/// A single-use bootstrap secret: 32 random bytes, lowercase hex.
///
/// The token is a bearer credential, so `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BootstrapToken(String);

impl BootstrapToken {
    /// Generate a fresh token from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Parse a token, requiring exactly 64 lowercase hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        if s.len() != TOKEN_HEX_LEN {
            return Err(CoreError::MalformedToken(format!(
                "expected {} characters, got {}",
                TOKEN_HEX_LEN,
                s.len()
            )));
        }
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(CoreError::MalformedToken(
                "expected lowercase hex".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    /// The hex form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BootstrapToken {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<BootstrapToken> for String {
    fn from(token: BootstrapToken) -> Self {
        token.0
    }
}

impl fmt::Debug for BootstrapToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BootstrapToken(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordManager {
        PasswordManager::with_params(8, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let pm = cheap();
        let hash = pm.hash("Secret1!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(pm.verify("Secret1!", &hash));
        assert!(!pm.verify("Secret2!", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let pm = cheap();
        let a = pm.hash("same").unwrap();
        let b = pm.hash("same").unwrap();
        assert_ne!(a, b);
        assert!(pm.verify("same", &a));
        assert!(pm.verify("same", &b));
    }

    #[test]
    fn test_verify_malformed_hash_is_false() {
        let pm = cheap();
        assert!(!pm.verify("anything", "not-a-phc-string"));
        assert!(!pm.verify("anything", ""));
    }

    #[test]
    fn test_verify_uses_params_from_hash() {
        let hash = cheap().hash("pw").unwrap();
        let other = PasswordManager::with_params(16, 2, 1).unwrap();
        assert!(other.verify("pw", &hash));
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(PasswordManager::with_params(0, 0, 0).is_err());
    }

    #[test]
    fn test_token_format() {
        let token = BootstrapToken::generate();
        assert_eq!(token.as_str().len(), TOKEN_HEX_LEN);
        assert!(BootstrapToken::from_hex(token.as_str()).is_ok());
        assert_ne!(token, BootstrapToken::generate());
    }

    #[test]
    fn test_token_parse_rejects_bad_input() {
        assert!(BootstrapToken::from_hex("abc").is_err());
        assert!(BootstrapToken::from_hex(&"A".repeat(64)).is_err());
        assert!(BootstrapToken::from_hex(&"g".repeat(64)).is_err());
        assert!(BootstrapToken::from_hex(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_token_debug_redacted() {
        let token = BootstrapToken::generate();
        let debug = format!("{:?}", token);
        assert!(!debug.contains(token.as_str()));
    }
}
