//! Permission administration: create, update, delete and list grants.
//!
//! Every operation checks the acting user first. A non-admin caller is
//! rejected with `Forbidden` before any input is looked at, so a malformed
//! request from an editor never reveals validation details.

use std::sync::Arc;

use slotguard_core::{
    now_millis, Permission, PermissionId, Resource, ResourceId, Role, SlotSet, UserId,
};
use slotguard_store::{CredentialStore, InsertResult};

use crate::engine::AccessDecisionEngine;
use crate::error::{PermsError, Result};

/// Admin-only write access to permission rows.
pub struct PermissionAdmin<S: CredentialStore> {
    store: Arc<S>,
    engine: AccessDecisionEngine<S>,
}

impl<S: CredentialStore> Clone for PermissionAdmin<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            engine: self.engine.clone(),
        }
    }
}

impl<S: CredentialStore> PermissionAdmin<S> {
    pub fn new(store: Arc<S>) -> Self {
        let engine = AccessDecisionEngine::new(Arc::clone(&store));
        Self { store, engine }
    }

    async fn require_admin(&self, actor: &UserId) -> Result<()> {
        if self.engine.can_administer(actor).await? {
            return Ok(());
        }
        tracing::warn!(actor = %actor, "permission change refused for non-admin");
        Err(PermsError::Forbidden(
            "only administrators may manage permissions".into(),
        ))
    }

    /// Fetch a permission and check it belongs to `owner`.
    ///
    /// A row owned by someone else is reported as missing.
    async fn owned_permission(
        &self,
        owner: &UserId,
        permission_id: &PermissionId,
    ) -> Result<Permission> {
        match self.store.get_permission(permission_id).await? {
            Some(p) if &p.user_id == owner => Ok(p),
            _ => Err(PermsError::NotFound("permission")),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant `user_id` access to `resource_id` for the requested slots.
    ///
    /// Checks run in order: actor is admin, slot list is valid, user and
    /// resource exist, user is an editor, no row exists for the pair.
    pub async fn create(
        &self,
        actor: &UserId,
        user_id: &UserId,
        resource_id: &ResourceId,
        requested: &[i64],
    ) -> Result<Permission> {
        self.require_admin(actor).await?;
        let slots = SlotSet::from_requested(requested)?;

        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(PermsError::NotFound("user"))?;
        if self.store.get_resource(resource_id).await?.is_none() {
            return Err(PermsError::NotFound("resource"));
        }
        if user.role != Role::Editor {
            return Err(PermsError::NotGrantable(user.id));
        }

        let permission = Permission::new(user.id, resource_id.clone(), slots, now_millis());
        match self.store.insert_permission(&permission).await? {
            InsertResult::Inserted => {
                tracing::info!(
                    permission = %permission.id,
                    user = %permission.user_id,
                    resource = %permission.resource_id,
                    slots = ?permission.allowed_slots,
                    "permission granted"
                );
                Ok(permission)
            }
            InsertResult::Conflict { existing } => {
                tracing::warn!(user = %user_id, resource = %resource_id, existing = %existing, "duplicate grant");
                Err(PermsError::Conflict { existing })
            }
        }
    }

    /// Replace the slot set of an existing grant.
    ///
    /// The new list replaces the old one entirely; the (user, resource) pair
    /// does not change.
    pub async fn update(
        &self,
        actor: &UserId,
        owner: &UserId,
        permission_id: &PermissionId,
        requested: &[i64],
    ) -> Result<Permission> {
        self.require_admin(actor).await?;
        let slots = SlotSet::from_requested(requested)?;
        let mut permission = self.owned_permission(owner, permission_id).await?;

        let now = now_millis();
        if !self
            .store
            .replace_allowed_slots(permission_id, &slots, now)
            .await?
        {
            return Err(PermsError::NotFound("permission"));
        }

        tracing::info!(permission = %permission_id, slots = ?slots, "permission slots replaced");
        permission.allowed_slots = slots;
        permission.updated_at = now;
        Ok(permission)
    }

    /// Remove a grant. The user and the resource are left alone.
    pub async fn delete(
        &self,
        actor: &UserId,
        owner: &UserId,
        permission_id: &PermissionId,
    ) -> Result<()> {
        self.require_admin(actor).await?;
        self.owned_permission(owner, permission_id).await?;

        if !self.store.delete_permission(permission_id).await? {
            return Err(PermsError::NotFound("permission"));
        }
        tracing::info!(permission = %permission_id, owner = %owner, "permission revoked");
        Ok(())
    }

    /// All grants held by `owner`, each with its resource, in resource
    /// listing order.
    pub async fn list(
        &self,
        actor: &UserId,
        owner: &UserId,
    ) -> Result<Vec<(Permission, Resource)>> {
        self.require_admin(actor).await?;
        if self.store.get_user(owner).await?.is_none() {
            return Err(PermsError::NotFound("user"));
        }
        Ok(self.store.list_permissions_for_user(owner).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use slotguard_core::{User, ValidationError};
    use slotguard_store::MemoryStore;
    use slotguard_testkit::generators::{invalid_slots, valid_slots};

    struct World {
        admin: PermissionAdmin<MemoryStore>,
        engine: AccessDecisionEngine<MemoryStore>,
        store: Arc<MemoryStore>,
        root: User,
        editor: User,
        resource: Resource,
    }

    async fn world() -> World {
        let store = Arc::new(MemoryStore::new());
        let root = User::new("root", "root@example.com", Role::Admin, 0);
        let editor = User::new("editor", "editor@example.com", Role::Editor, 0);
        let resource = Resource::new("Advent 2024", "advent-2024", 2024);
        store.insert_user(&root).await.unwrap();
        store.insert_user(&editor).await.unwrap();
        store.upsert_resource(&resource).await.unwrap();

        World {
            admin: PermissionAdmin::new(Arc::clone(&store)),
            engine: AccessDecisionEngine::new(Arc::clone(&store)),
            store,
            root,
            editor,
            resource,
        }
    }

    #[tokio::test]
    async fn test_grant_then_decide() {
        let w = world().await;
        let p = w
            .admin
            .create(&w.root.id, &w.editor.id, &w.resource.id, &[3, 1, 2])
            .await
            .unwrap();
        assert_eq!(p.allowed_slots.to_vec(), vec![1, 2, 3]);

        for slot in 1..=3 {
            assert!(w
                .engine
                .can_edit_slot_in_resource(&w.editor.id, &w.resource.id, slot)
                .await
                .unwrap());
        }
        assert!(!w
            .engine
            .can_edit_slot_in_resource(&w.editor.id, &w.resource.id, 4)
            .await
            .unwrap());
        assert!(w
            .engine
            .can_access_resource(&w.editor.id, &w.resource.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_update_replaces_wholesale() {
        let w = world().await;
        let p = w
            .admin
            .create(&w.root.id, &w.editor.id, &w.resource.id, &[1, 2, 3])
            .await
            .unwrap();

        let updated = w
            .admin
            .update(&w.root.id, &w.editor.id, &p.id, &[5])
            .await
            .unwrap();
        assert_eq!(updated.allowed_slots.to_vec(), vec![5]);

        assert!(!w
            .engine
            .can_edit_slot_in_resource(&w.editor.id, &w.resource.id, 1)
            .await
            .unwrap());
        assert!(w
            .engine
            .can_edit_slot_in_resource(&w.editor.id, &w.resource.id, 5)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_grant_conflicts() {
        let w = world().await;
        let first = w
            .admin
            .create(&w.root.id, &w.editor.id, &w.resource.id, &[1])
            .await
            .unwrap();

        match w
            .admin
            .create(&w.root.id, &w.editor.id, &w.resource.id, &[7, 8])
            .await
        {
            Err(PermsError::Conflict { existing }) => assert_eq!(existing, first.id),
            other => panic!("expected conflict, got {:?}", other),
        }

        let stored = w.store.get_permission(&first.id).await.unwrap().unwrap();
        assert_eq!(stored.allowed_slots.to_vec(), vec![1]);
    }

    async fn create(w: &World, slots: &[i64]) -> Result<Permission> {
        w.admin
            .create(&w.root.id, &w.editor.id, &w.resource.id, slots)
            .await
    }

    #[tokio::test]
    async fn test_slot_validation() {
        let w = world().await;
        assert!(matches!(
            create(&w, &[0]).await,
            Err(PermsError::Validation(ValidationError::SlotOutOfRange(0)))
        ));
        assert!(matches!(
            create(&w, &[26]).await,
            Err(PermsError::Validation(ValidationError::SlotOutOfRange(26)))
        ));
        assert!(matches!(
            create(&w, &[1, 1]).await,
            Err(PermsError::Validation(ValidationError::DuplicateSlot(1)))
        ));
        assert!(matches!(
            create(&w, &[]).await,
            Err(PermsError::Validation(ValidationError::EmptySlots))
        ));
        assert!(w
            .store
            .find_permission(&w.editor.id, &w.resource.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_editor_forbidden_before_validation() {
        let w = world().await;
        let result = w
            .admin
            .create(&w.editor.id, &w.editor.id, &w.resource.id, &[0])
            .await;
        assert!(matches!(result, Err(PermsError::Forbidden(_))));

        let listed = w.admin.list(&w.editor.id, &w.editor.id).await;
        assert!(matches!(listed, Err(PermsError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_missing_targets() {
        let w = world().await;
        assert!(matches!(
            w.admin
                .create(&w.root.id, &UserId::new("nobody"), &w.resource.id, &[1])
                .await,
            Err(PermsError::NotFound("user"))
        ));
        assert!(matches!(
            w.admin
                .create(&w.root.id, &w.editor.id, &ResourceId::new("nowhere"), &[1])
                .await,
            Err(PermsError::NotFound("resource"))
        ));
    }

    #[tokio::test]
    async fn test_admins_cannot_receive_grants() {
        let w = world().await;
        let result = w
            .admin
            .create(&w.root.id, &w.root.id, &w.resource.id, &[1])
            .await;
        assert!(matches!(result, Err(PermsError::NotGrantable(_))));
    }

    #[tokio::test]
    async fn test_owner_mismatch_is_not_found() {
        let w = world().await;
        let other = User::new("other", "other@example.com", Role::Editor, 0);
        w.store.insert_user(&other).await.unwrap();
        let p = w
            .admin
            .create(&w.root.id, &w.editor.id, &w.resource.id, &[1])
            .await
            .unwrap();

        assert!(matches!(
            w.admin.update(&w.root.id, &other.id, &p.id, &[2]).await,
            Err(PermsError::NotFound("permission"))
        ));
        assert!(matches!(
            w.admin.delete(&w.root.id, &other.id, &p.id).await,
            Err(PermsError::NotFound("permission"))
        ));

        w.admin.delete(&w.root.id, &w.editor.id, &p.id).await.unwrap();
        assert!(w.admin.list(&w.root.id, &w.editor.id).await.unwrap().is_empty());
        assert!(w.store.get_user(&w.editor.id).await.unwrap().is_some());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_rejected_slot_lists_write_nothing(slots in invalid_slots()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let w = world().await;
                assert!(matches!(
                    create(&w, &slots).await,
                    Err(PermsError::Validation(_))
                ));
                assert!(w
                    .store
                    .find_permission(&w.editor.id, &w.resource.id)
                    .await
                    .unwrap()
                    .is_none());
            });
        }

        #[test]
        fn test_accepted_slot_lists_are_stored_sorted(slots in valid_slots()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let w = world().await;
                let permission = create(&w, &slots).await.unwrap();

                let mut expected: Vec<u8> = slots.iter().map(|&s| s as u8).collect();
                expected.sort_unstable();
                assert_eq!(permission.allowed_slots.to_vec(), expected);
            });
        }
    }
}
