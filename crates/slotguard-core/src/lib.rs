//! # Slotguard Core
//!
//! Pure primitives for Slotguard: roles, day slots, account records,
//! bootstrap tokens and password hashing.
//!
//! This crate contains no I/O and no storage. Everything here is plain data
//! or pure computation.
//!
//! ## Key Types
//!
//! - [`Role`] - The closed pair of roles, `admin` and `editor`
//! - [`Slot`] / [`SlotSet`] - Day slots `1..=25` and validated sets of them
//! - [`User`], [`Resource`], [`Permission`] - The records the store persists
//! - [`SessionClaims`] - The login-time snapshot carried in a session
//! - [`BootstrapToken`] - The single-use first-login secret
//! - [`PasswordManager`] - Argon2id hashing and verification
//!
//! ## Validation
//!
//! Caller input (slot lists, emails, usernames, passwords) is checked by the
//! functions in [`validation`] and by [`SlotSet::from_requested`], all of
//! which report a [`ValidationError`].

pub mod crypto;
pub mod error;
pub mod model;
pub mod slots;
pub mod types;
pub mod validation;

pub use crypto::{BootstrapToken, PasswordManager, TOKEN_HEX_LEN};
pub use error::{CoreError, ValidationError};
pub use model::{Permission, Resource, SessionClaims, User};
pub use slots::{Slot, SlotSet, MAX_SLOT, MIN_SLOT};
pub use types::{now_millis, PermissionId, ResourceId, Role, UserId};
