//! # Slotguard Permissions
//!
//! Access decisions and permission administration.
//!
//! ## Overview
//!
//! Slotguard knows two roles. Admins may do everything and hold no grants.
//! Editors may do only what their permission rows allow: one row per
//! (editor, resource) pair, each scoped to a set of day slots `1..=25`.
//!
//! ## Key Types
//!
//! - [`AccessDecisionEngine`] - The four read-only decisions every protected
//!   operation asks
//! - [`PermissionIndex`] - Role-agnostic reads over permission rows
//! - [`PermissionAdmin`] - Admin-only create, update, delete and list of grants
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use slotguard_perms::{AccessDecisionEngine, PermissionAdmin};
//! use slotguard_store::MemoryStore;
//! use slotguard_core::{ResourceId, UserId};
//!
//! async fn example(admin: UserId, editor: UserId, resource: ResourceId) {
//!     let store = Arc::new(MemoryStore::new());
//!     let grants = PermissionAdmin::new(Arc::clone(&store));
//!     let engine = AccessDecisionEngine::new(store);
//!
//!     grants.create(&admin, &editor, &resource, &[1, 2, 3]).await.unwrap();
//!     assert!(engine.can_edit_slot_in_resource(&editor, &resource, 2).await.unwrap());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Role first**: every decision resolves the caller's role before any
//!   permission row is read
//! - **Deny by default**: no row means no access; a denial is never an error
//! - **Wholesale updates**: an update replaces the slot set, it never merges

pub mod engine;
pub mod error;
pub mod grant;
pub mod index;

pub use engine::AccessDecisionEngine;
pub use error::{PermsError, Result};
pub use grant::PermissionAdmin;
pub use index::PermissionIndex;
