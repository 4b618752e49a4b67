//! # Slotguard Credentials
//!
//! Bootstrap tokens, password login and signed sessions.
//!
//! ## Overview
//!
//! Administrators never handle a user's password. Provisioning an account
//! issues a single-use bootstrap token; the user redeems it once to set a
//! password, after which they log in normally and receive a signed session.
//!
//! ## Key Types
//!
//! - [`TokenLifecycleManager`] - Issue, verify and consume bootstrap tokens
//! - [`SessionAugmenter`] - Password login and the role/slot claims snapshot
//! - [`SessionSigner`] - Signs and checks session tokens under a [`SessionKey`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use slotguard_core::PasswordManager;
//! use slotguard_credentials::TokenLifecycleManager;
//! use slotguard_store::MemoryStore;
//! use slotguard_core::UserId;
//!
//! async fn example(user: UserId) {
//!     let store = Arc::new(MemoryStore::new());
//!     let tokens = TokenLifecycleManager::new(store);
//!
//!     let issued = tokens.issue(&user).await.unwrap();
//!     let holder = tokens.verify(issued.token.as_str()).await.unwrap();
//!
//!     let hash = PasswordManager::new().hash("Secret1!").unwrap();
//!     tokens.consume(issued.token.as_str(), &hash).await.unwrap();
//!     # let _ = holder;
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Single use**: redemption is one atomic store operation
//! - **Uniform failures**: unknown, replaced and used tokens all read as invalid;
//!   every login failure reads the same
//! - **Expiry**: a token is valid while `now <= expires_at`

pub mod error;
pub mod session;
pub mod token;

pub use error::{CredentialsError, Result, TokenError};
pub use session::{
    Session, SessionAugmenter, SessionKey, SessionSigner, SESSION_KEY_LEN, SESSION_TTL_MS,
};
pub use token::{IssuedToken, TokenHolder, TokenLifecycleManager, BOOTSTRAP_TOKEN_TTL_MS};
