//! In-memory implementation of the CredentialStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use slotguard_core::{
    BootstrapToken, Permission, PermissionId, Resource, ResourceId, SlotSet, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::traits::{ConsumeOutcome, CredentialStore, InsertResult, UniqueField, UserWriteResult};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; every
/// mutating operation holds the write lock for its whole check-then-write.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    users: HashMap<UserId, User>,
    resources: HashMap<ResourceId, Resource>,
    permissions: HashMap<PermissionId, Permission>,
}

impl MemoryStoreInner {
    /// Email is checked before username, matching the SQLite backend.
    fn duplicate_of(&self, user: &User) -> Option<UniqueField> {
        let mut others = self.users.values().filter(|u| u.id != user.id);
        if others.clone().any(|u| u.email == user.email) {
            Some(UniqueField::Email)
        } else if others.any(|u| u.username == user.username) {
            Some(UniqueField::Username)
        } else {
            None
        }
    }
}

fn in_listing_order<'a>(iter: impl Iterator<Item = &'a Resource>) -> Vec<Resource> {
    let mut out: Vec<Resource> = iter.cloned().collect();
    out.sort_by(Resource::listing_order);
    out
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<UserWriteResult> {
        let mut inner = self.write()?;

        if let Some(field) = inner.duplicate_of(user) {
            return Ok(UserWriteResult::Duplicate(field));
        }
        if inner.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user id {} exists", user.id)));
        }

        inner.users.insert(user.id.clone(), user.clone());
        Ok(UserWriteResult::Written)
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.read()?;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_token(&self, token: &BootstrapToken) -> Result<Option<User>> {
        let inner = self.read()?;
        Ok(inner
            .users
            .values()
            .find(|u| u.bootstrap_token.as_ref() == Some(token))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let inner = self.read()?;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<UserWriteResult> {
        let mut inner = self.write()?;

        if !inner.users.contains_key(&user.id) {
            return Ok(UserWriteResult::NotFound);
        }
        if let Some(field) = inner.duplicate_of(user) {
            return Ok(UserWriteResult::Duplicate(field));
        }

        if let Some(stored) = inner.users.get_mut(&user.id) {
            stored.username = user.username.clone();
            stored.display_name = user.display_name.clone();
            stored.email = user.email.clone();
            stored.role = user.role;
            stored.updated_at = user.updated_at;
        }
        Ok(UserWriteResult::Written)
    }

    async fn set_bootstrap_token(
        &self,
        id: &UserId,
        token: &BootstrapToken,
        expires_at: i64,
        now: i64,
    ) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.users.get_mut(id) {
            Some(user) => {
                user.bootstrap_token = Some(token.clone());
                user.bootstrap_token_expires_at = Some(expires_at);
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn consume_bootstrap_token(
        &self,
        token: &BootstrapToken,
        password_hash: &str,
        now: i64,
    ) -> Result<ConsumeOutcome> {
        let mut inner = self.write()?;

        let holder = inner
            .users
            .values_mut()
            .find(|u| u.bootstrap_token.as_ref() == Some(token));

        let Some(user) = holder else {
            return Ok(ConsumeOutcome::NotFound);
        };

        match user.bootstrap_token_expires_at {
            Some(expires_at) if now <= expires_at => {}
            _ => return Ok(ConsumeOutcome::Expired),
        }

        user.password_hash = Some(password_hash.to_string());
        user.bootstrap_token = None;
        user.bootstrap_token_expires_at = None;
        user.updated_at = now;

        Ok(ConsumeOutcome::Consumed(user.id.clone()))
    }

    async fn set_password_hash(&self, id: &UserId, password_hash: &str, now: i64) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.users.get_mut(id) {
            Some(user) => {
                user.password_hash = Some(password_hash.to_string());
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: &UserId) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.users.remove(id).is_none() {
            return Ok(false);
        }
        inner.permissions.retain(|_, p| &p.user_id != id);
        Ok(true)
    }

    async fn upsert_resource(&self, resource: &Resource) -> Result<()> {
        let mut inner = self.write()?;

        let slug_taken = inner
            .resources
            .values()
            .any(|r| r.slug == resource.slug && r.id != resource.id);
        if slug_taken {
            return Err(StoreError::Conflict(format!(
                "resource slug {} is taken",
                resource.slug
            )));
        }

        inner.resources.insert(resource.id.clone(), resource.clone());
        Ok(())
    }

    async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>> {
        Ok(self.read()?.resources.get(id).cloned())
    }

    async fn list_resources(&self) -> Result<Vec<Resource>> {
        let inner = self.read()?;
        Ok(in_listing_order(inner.resources.values()))
    }

    async fn resources_for_user(&self, user_id: &UserId) -> Result<Vec<Resource>> {
        let inner = self.read()?;
        let granted = inner
            .permissions
            .values()
            .filter(|p| &p.user_id == user_id)
            .filter_map(|p| inner.resources.get(&p.resource_id));
        Ok(in_listing_order(granted))
    }

    async fn delete_resource(&self, id: &ResourceId) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.resources.remove(id).is_none() {
            return Ok(false);
        }
        inner.permissions.retain(|_, p| &p.resource_id != id);
        Ok(true)
    }

    async fn insert_permission(&self, permission: &Permission) -> Result<InsertResult> {
        let mut inner = self.write()?;

        let existing = inner.permissions.values().find(|p| {
            p.user_id == permission.user_id && p.resource_id == permission.resource_id
        });
        if let Some(existing) = existing {
            return Ok(InsertResult::Conflict {
                existing: existing.id.clone(),
            });
        }

        if !inner.users.contains_key(&permission.user_id) {
            return Err(StoreError::MissingReference("user"));
        }
        if !inner.resources.contains_key(&permission.resource_id) {
            return Err(StoreError::MissingReference("resource"));
        }

        inner
            .permissions
            .insert(permission.id.clone(), permission.clone());
        Ok(InsertResult::Inserted)
    }

    async fn get_permission(&self, id: &PermissionId) -> Result<Option<Permission>> {
        Ok(self.read()?.permissions.get(id).cloned())
    }

    async fn find_permission(
        &self,
        user_id: &UserId,
        resource_id: &ResourceId,
    ) -> Result<Option<Permission>> {
        let inner = self.read()?;
        Ok(inner
            .permissions
            .values()
            .find(|p| &p.user_id == user_id && &p.resource_id == resource_id)
            .cloned())
    }

    async fn list_permissions_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<(Permission, Resource)>> {
        let inner = self.read()?;
        let mut rows: Vec<(Permission, Resource)> = inner
            .permissions
            .values()
            .filter(|p| &p.user_id == user_id)
            .filter_map(|p| {
                inner
                    .resources
                    .get(&p.resource_id)
                    .map(|r| (p.clone(), r.clone()))
            })
            .collect();
        rows.sort_by(|a, b| Resource::listing_order(&a.1, &b.1));
        Ok(rows)
    }

    async fn replace_allowed_slots(
        &self,
        id: &PermissionId,
        slots: &SlotSet,
        now: i64,
    ) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.permissions.get_mut(id) {
            Some(permission) => {
                permission.allowed_slots = slots.clone();
                permission.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_permission(&self, id: &PermissionId) -> Result<bool> {
        Ok(self.write()?.permissions.remove(id).is_some())
    }
}
