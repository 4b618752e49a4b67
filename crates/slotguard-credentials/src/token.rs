//! Bootstrap token lifecycle.
//!
//! A user moves through `NoToken -> Issued -> {Expired | Consumed}`. Issuing
//! again from any state replaces the token; consuming is terminal and is a
//! single atomic store operation, so of two concurrent redemptions exactly
//! one wins.

use std::sync::Arc;

use slotguard_core::{now_millis, BootstrapToken, UserId};
use slotguard_store::{ConsumeOutcome, CredentialStore};

use crate::error::TokenError;

/// Lifetime of a bootstrap token: 7 days.
pub const BOOTSTRAP_TOKEN_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// A freshly issued token. The token itself is returned only here.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: BootstrapToken,
    /// Unix ms after which the token stops verifying.
    pub expires_at: i64,
}

/// The account a valid token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHolder {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
}

/// Issues, verifies and consumes bootstrap tokens.
pub struct TokenLifecycleManager<S: CredentialStore> {
    store: Arc<S>,
    ttl_ms: i64,
}

impl<S: CredentialStore> Clone for TokenLifecycleManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ttl_ms: self.ttl_ms,
        }
    }
}

impl<S: CredentialStore> TokenLifecycleManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            ttl_ms: BOOTSTRAP_TOKEN_TTL_MS,
        }
    }

    /// Override the token lifetime.
    pub fn with_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    /// Issue a new token for `user_id`, replacing any previous one.
    pub async fn issue(&self, user_id: &UserId) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, now_millis()).await
    }

    pub async fn issue_at(&self, user_id: &UserId, now: i64) -> Result<IssuedToken, TokenError> {
        let token = BootstrapToken::generate();
        let expires_at = now.saturating_add(self.ttl_ms);

        if !self
            .store
            .set_bootstrap_token(user_id, &token, expires_at, now)
            .await?
        {
            return Err(TokenError::UnknownUser(user_id.clone()));
        }

        tracing::info!(user = %user_id, expires_at, "bootstrap token issued");
        Ok(IssuedToken { token, expires_at })
    }

    /// Check a token without consuming it.
    pub async fn verify(&self, token: &str) -> Result<TokenHolder, TokenError> {
        self.verify_at(token, now_millis()).await
    }

    /// [`verify`](Self::verify) as of `now`.
    ///
    /// The token is valid while `now <= expires_at`.
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<TokenHolder, TokenError> {
        let token = parse(token)?;
        let user = match self.store.get_user_by_token(&token).await? {
            Some(user) => user,
            None => {
                tracing::warn!("unknown bootstrap token presented");
                return Err(TokenError::Invalid);
            }
        };

        match user.bootstrap_token_expires_at {
            Some(expires_at) if now <= expires_at => Ok(TokenHolder {
                user_id: user.id,
                username: user.username,
                email: user.email,
            }),
            _ => {
                tracing::warn!(user = %user.id, "expired bootstrap token presented");
                Err(TokenError::Expired)
            }
        }
    }

    /// Redeem a token: store `password_hash` and clear the token.
    pub async fn consume(&self, token: &str, password_hash: &str) -> Result<UserId, TokenError> {
        self.consume_at(token, password_hash, now_millis()).await
    }

    /// [`consume`](Self::consume) as of `now`.
    pub async fn consume_at(
        &self,
        token: &str,
        password_hash: &str,
        now: i64,
    ) -> Result<UserId, TokenError> {
        let token = parse(token)?;
        match self
            .store
            .consume_bootstrap_token(&token, password_hash, now)
            .await?
        {
            ConsumeOutcome::Consumed(user_id) => {
                tracing::info!(user = %user_id, "bootstrap token consumed");
                Ok(user_id)
            }
            ConsumeOutcome::NotFound => {
                tracing::warn!("bootstrap token redemption refused");
                Err(TokenError::Invalid)
            }
            ConsumeOutcome::Expired => {
                tracing::warn!("expired bootstrap token redemption refused");
                Err(TokenError::Expired)
            }
        }
    }
}

fn parse(token: &str) -> Result<BootstrapToken, TokenError> {
    BootstrapToken::from_hex(token).map_err(|_| TokenError::Invalid)
}
