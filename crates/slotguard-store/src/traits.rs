//! CredentialStore trait: the abstract interface for account and grant
//! persistence.
//!
//! Every Slotguard component receives a store through this trait, so the
//! decision engine and the token lifecycle never depend on a concrete
//! database. Implementations include SQLite (primary) and in-memory (tests).

use async_trait::async_trait;
use slotguard_core::{
    BootstrapToken, Permission, PermissionId, Resource, ResourceId, SlotSet, User, UserId,
};

use crate::error::Result;

/// Result of inserting a permission row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Row was inserted.
    Inserted,
    /// A row for the same (user, resource) pair already exists; it is left
    /// untouched.
    Conflict {
        /// The existing permission for the pair.
        existing: PermissionId,
    },
}

/// Which unique account field a write collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
}

/// Result of inserting or updating a user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserWriteResult {
    /// Record was written.
    Written,
    /// No user with that id (updates only).
    NotFound,
    /// Another user already holds this email or username.
    Duplicate(UniqueField),
}

/// Result of redeeming a bootstrap token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The password hash was written and the token cleared.
    Consumed(UserId),
    /// No user holds this token (never issued, replaced, or already used).
    NotFound,
    /// The token exists but `now` is past its expiry. Nothing was written.
    Expired,
}

/// The CredentialStore trait: async interface for users, resources and
/// permission rows.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Unique grants**: at most one permission per (user, resource) pair;
///   a second insert reports `Conflict` and changes nothing.
/// - **Atomic redemption**: [`consume_bootstrap_token`](Self::consume_bootstrap_token)
///   validates and clears the token in a single step, so of two concurrent
///   redemptions exactly one succeeds.
/// - **Cascades**: deleting a user or a resource deletes its permission rows.
/// - **Ordering**: resource lists are ordered by year descending, then name.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // User Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new user.
    ///
    /// Returns `Duplicate` if the email or username is already taken.
    async fn insert_user(&self, user: &User) -> Result<UserWriteResult>;

    /// Get a user by id.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Get a user by email (exact match).
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get the user currently holding a bootstrap token.
    async fn get_user_by_token(&self, token: &BootstrapToken) -> Result<Option<User>>;

    /// List all users, newest first.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Overwrite a user's profile fields (username, display name, email,
    /// role) and `updated_at`.
    ///
    /// Credential columns are not touched; use the dedicated methods below.
    async fn update_user(&self, user: &User) -> Result<UserWriteResult>;

    /// Store a new bootstrap token for a user, replacing any previous one.
    ///
    /// Returns `false` if the user does not exist.
    async fn set_bootstrap_token(
        &self,
        id: &UserId,
        token: &BootstrapToken,
        expires_at: i64,
        now: i64,
    ) -> Result<bool>;

    /// Redeem a bootstrap token.
    ///
    /// In one atomic step: find the holder, check `now <= expires_at`, write
    /// `password_hash` and clear both token columns.
    async fn consume_bootstrap_token(
        &self,
        token: &BootstrapToken,
        password_hash: &str,
        now: i64,
    ) -> Result<ConsumeOutcome>;

    /// Replace a user's password hash.
    ///
    /// Returns `false` if the user does not exist.
    async fn set_password_hash(&self, id: &UserId, password_hash: &str, now: i64) -> Result<bool>;

    /// Delete a user and their permission rows.
    ///
    /// Returns `false` if the user did not exist.
    async fn delete_user(&self, id: &UserId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Resource Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace a resource.
    ///
    /// Fails with `StoreError::Conflict` if another resource has the slug.
    async fn upsert_resource(&self, resource: &Resource) -> Result<()>;

    /// Get a resource by id.
    async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>>;

    /// List all resources, year descending then name ascending.
    async fn list_resources(&self) -> Result<Vec<Resource>>;

    /// Resources the user holds a permission row for, in listing order.
    async fn resources_for_user(&self, user_id: &UserId) -> Result<Vec<Resource>>;

    /// Delete a resource and every permission row referencing it.
    ///
    /// Returns `false` if the resource did not exist.
    async fn delete_resource(&self, id: &ResourceId) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Permission Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a permission row.
    ///
    /// # Returns
    /// - `Inserted` if the (user, resource) pair had no row.
    /// - `Conflict` with the existing row's id otherwise.
    async fn insert_permission(&self, permission: &Permission) -> Result<InsertResult>;

    /// Get a permission by id.
    async fn get_permission(&self, id: &PermissionId) -> Result<Option<Permission>>;

    /// Get the permission for a (user, resource) pair.
    async fn find_permission(
        &self,
        user_id: &UserId,
        resource_id: &ResourceId,
    ) -> Result<Option<Permission>>;

    /// All permission rows of a user with their resources, in resource
    /// listing order.
    async fn list_permissions_for_user(&self, user_id: &UserId)
        -> Result<Vec<(Permission, Resource)>>;

    /// Replace a permission's slot set wholesale.
    ///
    /// Returns `false` if the permission does not exist.
    async fn replace_allowed_slots(
        &self,
        id: &PermissionId,
        slots: &SlotSet,
        now: i64,
    ) -> Result<bool>;

    /// Delete a permission row.
    ///
    /// Returns `false` if it did not exist.
    async fn delete_permission(&self, id: &PermissionId) -> Result<bool>;
}
