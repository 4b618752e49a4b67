//! # Slotguard
//!
//! Editorial access control: two roles, slot-scoped grants and a
//! first-login credential bootstrap.
//!
//! ## Overview
//!
//! Slotguard decides, for any (user, resource, slot) triple, whether an
//! editorial operation is permitted, and lets administrators provision
//! accounts without ever handling a plaintext password:
//!
//! - **Roles**: admins may do everything; editors only what they are granted
//! - **Grants**: one permission per (editor, resource), scoped to day slots `1..=25`
//! - **Bootstrap**: a new account gets a single-use, 7-day first-login link
//! - **Sessions**: login yields a signed snapshot of role and slots
//!
//! ## Usage
//!
//! ```rust,no_run
//! use slotguard::{Gate, GateConfig};
//! use slotguard::core::Role;
//! use slotguard::store::SqliteStore;
//!
//! async fn example(admin_session: &str) {
//!     let store = SqliteStore::open("slotguard.db").unwrap();
//!     let gate = Gate::new(store, GateConfig::from_env().unwrap());
//!
//!     // An admin provisions an editor and hands over the link
//!     let (user, link) = gate
//!         .provision_user(Some(admin_session), "hanako@example.com", Role::Editor)
//!         .await
//!         .unwrap();
//!     println!("{} -> {}", user.email, link.url);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `slotguard::core` - Roles, slots, records and password hashing
//! - `slotguard::store` - Storage abstraction, SQLite and in-memory stores
//! - `slotguard::perms` - Access decisions and permission administration
//! - `slotguard::credentials` - Bootstrap tokens and sessions

pub mod config;
pub mod error;
pub mod gate;

// Re-export component crates
pub use slotguard_core as core;
pub use slotguard_credentials as credentials;
pub use slotguard_perms as perms;
pub use slotguard_store as store;

// Re-export main types for convenience
pub use config::GateConfig;
pub use error::{GateError, Result};
pub use gate::{FirstLoginLink, Gate, UserSummary, UserUpdate};

// Re-export commonly used types
pub use slotguard_core::{
    Permission, PermissionId, Resource, ResourceId, Role, SessionClaims, SlotSet, User, UserId,
};
pub use slotguard_credentials::{Session, TokenHolder};
