//! Error types for the credentials module.

use slotguard_core::{CoreError, UserId};
use slotguard_perms::PermsError;
use slotguard_store::StoreError;
use thiserror::Error;

/// Why a bootstrap token was not accepted.
///
/// Unknown, malformed, replaced and already-used tokens are deliberately
/// indistinguishable; they all report `Invalid`.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid or already used token")]
    Invalid,

    #[error("token has expired")]
    Expired,

    /// A token was requested for a user that does not exist.
    #[error("user not found: {0}")]
    UnknownUser(UserId),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from login and session handling.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Unknown email, no password set, or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// A session token that is malformed or carries a bad signature.
    #[error("invalid session: {0}")]
    InvalidSession(String),

    #[error("session has expired")]
    SessionExpired,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Perms(#[from] PermsError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for login and session operations.
pub type Result<T> = std::result::Result<T, CredentialsError>;
