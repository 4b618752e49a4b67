//! # Slotguard Testkit
//!
//! Testing utilities for Slotguard.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A store seeded with an admin, an editor and three resources
//! - **Generators**: Proptest strategies for slot lists, passwords and emails
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use slotguard_store::MemoryStore;
//! use slotguard_testkit::fixtures::Seeded;
//!
//! async fn example() {
//!     let seeded = Seeded::new(MemoryStore::new()).await;
//!     seeded.grant(&seeded.resources[0], &[1, 2, 3]).await;
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use slotguard_testkit::generators::GrantProbe;
//!
//! proptest! {
//!     #[test]
//!     fn probe_is_answered(probe: GrantProbe) {
//!         // grant probe.slots, then ask about probe.probe
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{cheap_passwords, Seeded, ADMIN_EMAIL, EDITOR_EMAIL, PASSWORD};
pub use generators::GrantProbe;
