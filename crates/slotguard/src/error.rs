//! Error types for the Gate.
//!
//! Every failure a caller can see is one [`GateError`]. Each variant has a
//! stable [`kind`](GateError::kind) and an HTTP-equivalent
//! [`status`](GateError::status) so an embedding web layer can answer
//! without inspecting messages.

use slotguard_core::{CoreError, PermissionId, ValidationError};
use slotguard_credentials::{CredentialsError, TokenError};
use slotguard_perms::PermsError;
use slotguard_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Gate operations.
#[derive(Debug, Error)]
pub enum GateError {
    /// No valid session.
    #[error("authentication required: {0}")]
    Unauthenticated(String),

    /// Authenticated, but not allowed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A well-formed request the current state does not allow.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid or already used token")]
    TokenInvalid,

    #[error("token has expired, ask an administrator for a new link")]
    TokenExpired,

    /// A permission already exists for this (user, resource) pair.
    #[error("permission already exists: {existing}")]
    PermissionConflict { existing: PermissionId },

    /// Duplicate email or username.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid email or password")]
    InvalidCredentials,

    /// Bad configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage or primitive failure. The message is for logs, not callers.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// HTTP-equivalent status code.
    pub fn status(&self) -> u16 {
        match self {
            GateError::Unauthenticated(_) | GateError::InvalidCredentials => 401,
            GateError::Forbidden(_) => 403,
            GateError::Validation(_)
            | GateError::BadRequest(_)
            | GateError::TokenInvalid
            | GateError::TokenExpired => 400,
            GateError::NotFound(_) => 404,
            GateError::PermissionConflict { .. } | GateError::Conflict(_) => 409,
            GateError::Config(_) | GateError::Internal(_) => 500,
        }
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            GateError::Unauthenticated(_) => "unauthenticated",
            GateError::Forbidden(_) => "forbidden",
            GateError::Validation(_) => "validation",
            GateError::BadRequest(_) => "bad_request",
            GateError::TokenInvalid => "token_invalid",
            GateError::TokenExpired => "token_expired",
            GateError::PermissionConflict { .. } => "permission_conflict",
            GateError::Conflict(_) => "conflict",
            GateError::NotFound(_) => "not_found",
            GateError::InvalidCredentials => "invalid_credentials",
            GateError::Config(_) => "config",
            GateError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for GateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => GateError::Conflict(msg),
            StoreError::MissingReference(what) => GateError::NotFound(what),
            other => GateError::Internal(other.to_string()),
        }
    }
}

impl From<CoreError> for GateError {
    fn from(err: CoreError) -> Self {
        GateError::Internal(err.to_string())
    }
}

impl From<PermsError> for GateError {
    fn from(err: PermsError) -> Self {
        match err {
            PermsError::Forbidden(msg) => GateError::Forbidden(msg),
            PermsError::NotFound(what) => GateError::NotFound(what),
            PermsError::Conflict { existing } => GateError::PermissionConflict { existing },
            PermsError::NotGrantable(_) => {
                GateError::BadRequest("permissions can only be granted to editors".into())
            }
            PermsError::Validation(e) => GateError::Validation(e),
            PermsError::Store(e) => e.into(),
        }
    }
}

impl From<TokenError> for GateError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => GateError::TokenInvalid,
            TokenError::Expired => GateError::TokenExpired,
            TokenError::UnknownUser(_) => GateError::NotFound("user"),
            TokenError::Store(e) => e.into(),
        }
    }
}

impl From<CredentialsError> for GateError {
    fn from(err: CredentialsError) -> Self {
        match err {
            CredentialsError::Token(e) => e.into(),
            CredentialsError::InvalidCredentials => GateError::InvalidCredentials,
            CredentialsError::InvalidSession(_) => {
                GateError::Unauthenticated("invalid session".into())
            }
            CredentialsError::SessionExpired => {
                GateError::Unauthenticated("session has expired".into())
            }
            CredentialsError::Core(e) => e.into(),
            CredentialsError::Perms(e) => e.into(),
            CredentialsError::Store(e) => e.into(),
        }
    }
}

/// Result type for Gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
