//! # Slotguard Store
//!
//! Storage abstraction for Slotguard. Provides a trait-based interface for
//! users, resources and permission rows with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The store module abstracts persistence behind the [`CredentialStore`]
//! trait, so the decision engine and the credential lifecycle are
//! storage-agnostic. The primary implementation is [`SqliteStore`], with
//! [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`CredentialStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting a permission row
//! - [`UserWriteResult`] - Result of inserting or updating a user
//! - [`ConsumeOutcome`] - Result of redeeming a bootstrap token
//!
//! ## Usage
//!
//! ```rust,no_run
//! use slotguard_store::{CredentialStore, SqliteStore};
//! use slotguard_core::{now_millis, Role, User};
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("slotguard.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let user = User::new("hanako", "hanako@example.com", Role::Editor, now_millis());
//!     store.insert_user(&user).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Unique grants**: a second permission for the same pair returns `Conflict`
//! - **Atomic redemption**: token check and clear happen in one transaction
//! - **Cascades**: permission rows die with their user or resource
//! - **Slot encoding**: slot sets are CBOR inside SQLite and typed everywhere else

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{ConsumeOutcome, CredentialStore, InsertResult, UniqueField, UserWriteResult};
