//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Column encoding error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A uniqueness rule outside the ones reported through result enums.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A row refers to a user or resource that does not exist.
    #[error("unknown {0}")]
    MissingReference(&'static str),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Lock poisoning or a failed blocking task.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
