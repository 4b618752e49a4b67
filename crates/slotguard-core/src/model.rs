//! Accounts, resources, permission rows and session claims.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::BootstrapToken;
use crate::slots::SlotSet;
use crate::types::{PermissionId, ResourceId, Role, UserId};

/// A user account.
///
/// An account without a password hash can only authenticate by redeeming
/// its bootstrap token. `Debug` redacts the hash and the token.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub email: String,
    pub role: Role,
    pub password_hash: Option<String>,
    pub bootstrap_token: Option<BootstrapToken>,
    /// Expiry of `bootstrap_token` (Unix ms).
    pub bootstrap_token_expires_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    /// A new account with no password and no token.
    pub fn new(username: impl Into<String>, email: impl Into<String>, role: Role, now: i64) -> Self {
        Self {
            id: UserId::generate(),
            username: username.into(),
            display_name: None,
            email: email.into(),
            role,
            password_hash: None,
            bootstrap_token: None,
            bootstrap_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("has_password", &self.has_password())
            .field("has_token", &self.bootstrap_token.is_some())
            .finish()
    }
}

/// A resource ("calendar") holding up to 25 day slots.
///
/// Resources are owned by an external collaborator; Slotguard only reads
/// them to answer access questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub slug: String,
    pub year: i32,
    pub is_published: bool,
}

impl Resource {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, year: i32) -> Self {
        Self {
            id: ResourceId::generate(),
            name: name.into(),
            slug: slug.into(),
            year,
            is_published: false,
        }
    }

    /// Listing order: newest year first, then name ascending.
    pub fn listing_order(a: &Resource, b: &Resource) -> Ordering {
        b.year.cmp(&a.year).then_with(|| a.name.cmp(&b.name))
    }
}

/// A grant of one editor to one resource, scoped to a slot set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: PermissionId,
    pub user_id: UserId,
    pub resource_id: ResourceId,
    pub allowed_slots: SlotSet,
    #[serde(skip)]
    pub created_at: i64,
    #[serde(skip)]
    pub updated_at: i64,
}

impl Permission {
    pub fn new(user_id: UserId, resource_id: ResourceId, allowed_slots: SlotSet, now: i64) -> Self {
        Self {
            id: PermissionId::generate(),
            user_id,
            resource_id,
            allowed_slots,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Login-time snapshot of who the caller is.
///
/// `allowed_slots` is informational: access decisions always re-read the
/// permission rows, so a stale snapshot never widens access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub id: UserId,
    pub role: Role,
    pub allowed_slots: Vec<u8>,
}
