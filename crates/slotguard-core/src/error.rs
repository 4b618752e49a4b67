//! Error types for Slotguard Core.

use thiserror::Error;

/// Core errors from the cryptographic primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("malformed token: {0}")]
    MalformedToken(String),
}

/// Validation errors for caller-supplied input.
///
/// These are the rejections an embedding application reports back to the
/// caller as a bad request; the message is safe to show.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one slot is required")]
    EmptySlots,

    #[error("slot {0} is out of range (1-25)")]
    SlotOutOfRange(i64),

    #[error("slot {0} is listed more than once")]
    DuplicateSlot(u8),

    #[error("invalid email address")]
    InvalidEmail,

    #[error("username must be between 3 and 20 characters")]
    UsernameLength,

    #[error("username may only contain letters, digits and underscores")]
    UsernameCharset,

    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("password must contain {0}")]
    PasswordMissingClass(&'static str),

    #[error("password confirmation does not match")]
    PasswordMismatch,

    #[error("new password must differ from the current password")]
    PasswordUnchanged,

    #[error("display name must be at most {0} characters")]
    DisplayNameTooLong(usize),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}
