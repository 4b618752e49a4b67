//! Error types for the permissions module.

use slotguard_core::{PermissionId, UserId, ValidationError};
use slotguard_store::StoreError;
use thiserror::Error;

/// Errors that can occur during permission operations.
///
/// Access *decisions* never produce these for a denial; a denial is `false`
/// or an empty result. Only the administrative operations report
/// `Forbidden`, `NotFound` and friends.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The acting user may not administer permissions.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A referenced user, resource or permission does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A permission already exists for this (user, resource) pair.
    #[error("permission already exists: {existing}")]
    Conflict { existing: PermissionId },

    /// Grants can only be given to editors.
    #[error("user {0} is not an editor and cannot receive a grant")]
    NotGrantable(UserId),

    /// Malformed slot list.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
