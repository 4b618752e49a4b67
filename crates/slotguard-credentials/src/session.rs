//! Login and signed sessions.
//!
//! A successful login produces [`SessionClaims`], a snapshot of the user's
//! role and slots, and a signed session token carrying them. The token is
//! `hex(cbor(envelope)).hex(mac)` where the MAC is a keyed BLAKE3 hash of
//! the CBOR bytes under a 32-byte server secret.
//!
//! Claims may go stale between login and the next request. Access decisions
//! never rely on them; they always re-read the store.

use std::fmt;
use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use slotguard_core::{now_millis, PasswordManager, SessionClaims, User};
use slotguard_perms::AccessDecisionEngine;
use slotguard_store::CredentialStore;

use crate::error::{CredentialsError, Result};

/// Default session lifetime: 30 days.
pub const SESSION_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Length of a session signing key in bytes.
pub const SESSION_KEY_LEN: usize = 32;

// ─────────────────────────────────────────────────────────────────────────────
// Signing
// ─────────────────────────────────────────────────────────────────────────────

/// Server secret used to sign session tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    /// A fresh random key. Sessions signed with it die with the process.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a key from 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| CredentialsError::InvalidSession(format!("session key: {}", e)))?;
        let bytes: [u8; SESSION_KEY_LEN] = bytes.try_into().map_err(|_| {
            CredentialsError::InvalidSession(format!(
                "session key must be {} bytes",
                SESSION_KEY_LEN
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    claims: SessionClaims,
    issued_at: i64,
    expires_at: i64,
}

/// Signs and checks session tokens.
#[derive(Debug, Clone)]
pub struct SessionSigner {
    key: SessionKey,
    ttl_ms: i64,
}

impl SessionSigner {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            ttl_ms: SESSION_TTL_MS,
        }
    }

    pub fn with_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    /// Sign `claims` as of `now`. Returns the token and its expiry.
    pub fn sign_at(&self, claims: &SessionClaims, now: i64) -> Result<(String, i64)> {
        let envelope = Envelope {
            claims: claims.clone(),
            issued_at: now,
            expires_at: now.saturating_add(self.ttl_ms),
        };

        let mut payload = Vec::new();
        ciborium::into_writer(&envelope, &mut payload)
            .map_err(|e| CredentialsError::InvalidSession(e.to_string()))?;
        let mac = blake3::keyed_hash(&self.key.0, &payload);

        let token = format!("{}.{}", hex::encode(&payload), mac.to_hex());
        Ok((token, envelope.expires_at))
    }

    /// Check a token's signature and expiry and return its claims.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<SessionClaims> {
        let (payload_hex, mac_hex) = token
            .split_once('.')
            .ok_or_else(|| CredentialsError::InvalidSession("malformed token".into()))?;

        let payload = hex::decode(payload_hex)
            .map_err(|_| CredentialsError::InvalidSession("malformed payload".into()))?;
        let mac: [u8; 32] = hex::decode(mac_hex)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| CredentialsError::InvalidSession("malformed signature".into()))?;

        // blake3::Hash equality is constant time
        if blake3::keyed_hash(&self.key.0, &payload) != blake3::Hash::from(mac) {
            return Err(CredentialsError::InvalidSession("bad signature".into()));
        }

        let envelope: Envelope = ciborium::from_reader(payload.as_slice())
            .map_err(|_| CredentialsError::InvalidSession("malformed payload".into()))?;
        if now > envelope.expires_at {
            return Err(CredentialsError::SessionExpired);
        }
        Ok(envelope.claims)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Login
// ─────────────────────────────────────────────────────────────────────────────

/// The outcome of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub claims: SessionClaims,
    /// Signed token to present on later requests.
    pub token: String,
    pub expires_at: i64,
}

/// Authenticates users and attaches role and slot claims to their session.
pub struct SessionAugmenter<S: CredentialStore> {
    store: Arc<S>,
    engine: AccessDecisionEngine<S>,
    passwords: PasswordManager,
    signer: SessionSigner,
}

impl<S: CredentialStore> SessionAugmenter<S> {
    pub fn new(store: Arc<S>, passwords: PasswordManager, signer: SessionSigner) -> Self {
        let engine = AccessDecisionEngine::new(Arc::clone(&store));
        Self {
            store,
            engine,
            passwords,
            signer,
        }
    }

    /// Build the claims snapshot for `user`.
    ///
    /// Admins carry every slot; editors the union of their grants.
    pub async fn claims_for(&self, user: &User) -> Result<SessionClaims> {
        let slots = self.engine.session_slots(&user.id).await?;
        Ok(SessionClaims {
            id: user.id.clone(),
            role: user.role,
            allowed_slots: slots.to_vec(),
        })
    }

    /// Log in with email and password.
    ///
    /// Unknown email, an account without a password and a wrong password
    /// all fail the same way.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        self.login_at(email, password, now_millis()).await
    }

    pub async fn login_at(&self, email: &str, password: &str, now: i64) -> Result<Session> {
        let user = self.store.get_user_by_email(email).await?;
        let user = match user {
            Some(user)
                if user
                    .password_hash
                    .as_deref()
                    .is_some_and(|hash| self.passwords.verify(password, hash)) =>
            {
                user
            }
            _ => {
                tracing::warn!("login refused");
                return Err(CredentialsError::InvalidCredentials);
            }
        };

        let claims = self.claims_for(&user).await?;
        let (token, expires_at) = self.signer.sign_at(&claims, now)?;
        tracing::info!(user = %user.id, role = %user.role, "login");
        Ok(Session {
            claims,
            token,
            expires_at,
        })
    }

    /// Resolve a session token to its claims.
    pub fn authenticate(&self, token: &str) -> Result<SessionClaims> {
        self.authenticate_at(token, now_millis())
    }

    pub fn authenticate_at(&self, token: &str, now: i64) -> Result<SessionClaims> {
        self.signer.verify_at(token, now)
    }
}
