//! The access decision engine.
//!
//! Four read-only, total decision functions answer every access question a
//! protected operation asks. Each one resolves the caller's standing first
//! and short-circuits for admins before any permission lookup, so the four
//! always agree on what an admin may do.
//!
//! A denial is `false` or an empty result, never an error. Errors are
//! reserved for store failures and malformed stored data.

use std::sync::Arc;

use slotguard_core::{Resource, ResourceId, Role, SlotSet, UserId};
use slotguard_store::CredentialStore;

use crate::error::Result;
use crate::index::PermissionIndex;

/// How the engine sees a user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Standing {
    /// Everything is permitted; no permission rows are consulted.
    Admin,
    /// Only explicit permission rows count.
    Editor,
    /// No such user. Treated as an editor with no rows.
    Unknown,
}

impl From<Option<Role>> for Standing {
    fn from(role: Option<Role>) -> Self {
        match role {
            Some(Role::Admin) => Standing::Admin,
            Some(Role::Editor) => Standing::Editor,
            None => Standing::Unknown,
        }
    }
}

/// Answers (user, resource, slot) access questions against current store
/// state.
pub struct AccessDecisionEngine<S: CredentialStore> {
    store: Arc<S>,
    index: PermissionIndex<S>,
}

impl<S: CredentialStore> Clone for AccessDecisionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            index: self.index.clone(),
        }
    }
}

impl<S: CredentialStore> AccessDecisionEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        let index = PermissionIndex::new(Arc::clone(&store));
        Self { store, index }
    }

    /// The permission index the engine consults for editors.
    pub fn index(&self) -> &PermissionIndex<S> {
        &self.index
    }

    /// Resolve the role short-circuit shared by every decision.
    pub(crate) async fn resolve_role(&self, user_id: &UserId) -> Result<Standing> {
        let role = self.store.get_user(user_id).await?.map(|u| u.role);
        Ok(Standing::from(role))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decisions
    // ─────────────────────────────────────────────────────────────────────────

    /// May the user see and manage the resource at all?
    ///
    /// Admins always may. Editors may iff a permission row exists for the
    /// pair, whatever its slots.
    pub async fn can_access_resource(
        &self,
        user_id: &UserId,
        resource_id: &ResourceId,
    ) -> Result<bool> {
        let allowed = match self.resolve_role(user_id).await? {
            Standing::Admin => true,
            Standing::Editor | Standing::Unknown => self
                .index
                .slots_for(user_id, resource_id)
                .await?
                .is_some(),
        };

        tracing::debug!(user = %user_id, resource = %resource_id, allowed, "resource access");
        Ok(allowed)
    }

    /// May the user edit `slot` of the resource?
    ///
    /// Equivalent to membership in
    /// [`allowed_slots_for_resource`](Self::allowed_slots_for_resource); a
    /// number outside `1..=25` is never editable.
    pub async fn can_edit_slot_in_resource(
        &self,
        user_id: &UserId,
        resource_id: &ResourceId,
        slot: i64,
    ) -> Result<bool> {
        let allowed = self
            .allowed_slots_for_resource(user_id, resource_id)
            .await?
            .contains_number(slot);

        tracing::debug!(user = %user_id, resource = %resource_id, slot, allowed, "slot edit");
        Ok(allowed)
    }

    /// The slots the user may edit in the resource.
    ///
    /// Admins get the full range, synthesised; they have no rows. Editors
    /// get their row's slots, or the empty set without a row.
    pub async fn allowed_slots_for_resource(
        &self,
        user_id: &UserId,
        resource_id: &ResourceId,
    ) -> Result<SlotSet> {
        match self.resolve_role(user_id).await? {
            Standing::Admin => Ok(SlotSet::full()),
            Standing::Editor | Standing::Unknown => Ok(self
                .index
                .slots_for(user_id, resource_id)
                .await?
                .unwrap_or_default()),
        }
    }

    /// Resources the user can access, newest year first then by name.
    ///
    /// Admins see every resource; editors exactly those their rows reference.
    pub async fn accessible_resources_for_user(&self, user_id: &UserId) -> Result<Vec<Resource>> {
        match self.resolve_role(user_id).await? {
            Standing::Admin => Ok(self.store.list_resources().await?),
            Standing::Editor | Standing::Unknown => self.index.resources_for(user_id).await,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role-derived answers for the caller guards and the session snapshot
    // ─────────────────────────────────────────────────────────────────────────

    /// May the user administer accounts and permissions?
    pub async fn can_administer(&self, user_id: &UserId) -> Result<bool> {
        Ok(self.resolve_role(user_id).await? == Standing::Admin)
    }

    /// The slot list recorded in a login-time session snapshot.
    ///
    /// Admins get the full range; editors the union of their rows' slots.
    pub async fn session_slots(&self, user_id: &UserId) -> Result<SlotSet> {
        match self.resolve_role(user_id).await? {
            Standing::Admin => Ok(SlotSet::full()),
            Standing::Editor | Standing::Unknown => self.index.slot_union(user_id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use slotguard_core::{Permission, User};
    use slotguard_store::MemoryStore;
    use slotguard_testkit::generators::{valid_slots, GrantProbe};

    struct World {
        engine: AccessDecisionEngine<MemoryStore>,
        store: Arc<MemoryStore>,
        admin: User,
        editor: User,
        resource: Resource,
    }

    async fn world() -> World {
        let store = Arc::new(MemoryStore::new());
        let admin = User::new("admin", "admin@example.com", Role::Admin, 0);
        let editor = User::new("editor", "editor@example.com", Role::Editor, 0);
        let resource = Resource::new("Advent 2024", "advent-2024", 2024);
        store.insert_user(&admin).await.unwrap();
        store.insert_user(&editor).await.unwrap();
        store.upsert_resource(&resource).await.unwrap();

        World {
            engine: AccessDecisionEngine::new(Arc::clone(&store)),
            store,
            admin,
            editor,
            resource,
        }
    }

    async fn grant(w: &World, slots: &[i64]) {
        let permission = Permission::new(
            w.editor.id.clone(),
            w.resource.id.clone(),
            SlotSet::from_requested(slots).unwrap(),
            0,
        );
        w.store.insert_permission(&permission).await.unwrap();
    }

    #[tokio::test]
    async fn test_admin_omnipotence() {
        let w = world().await;
        let e = &w.engine;

        assert!(e.can_access_resource(&w.admin.id, &w.resource.id).await.unwrap());
        for slot in 1..=25 {
            assert!(e
                .can_edit_slot_in_resource(&w.admin.id, &w.resource.id, slot)
                .await
                .unwrap());
        }
        assert_eq!(
            e.allowed_slots_for_resource(&w.admin.id, &w.resource.id)
                .await
                .unwrap(),
            SlotSet::full()
        );

        // No row needed, not even for a resource the store has never seen
        let unseen = ResourceId::new("unseen");
        assert!(e.can_access_resource(&w.admin.id, &unseen).await.unwrap());
        assert!(e.can_administer(&w.admin.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_editor_default_deny() {
        let w = world().await;
        let e = &w.engine;

        assert!(!e.can_access_resource(&w.editor.id, &w.resource.id).await.unwrap());
        for slot in 1..=25 {
            assert!(!e
                .can_edit_slot_in_resource(&w.editor.id, &w.resource.id, slot)
                .await
                .unwrap());
        }
        assert!(e
            .allowed_slots_for_resource(&w.editor.id, &w.resource.id)
            .await
            .unwrap()
            .is_empty());
        assert!(e
            .accessible_resources_for_user(&w.editor.id)
            .await
            .unwrap()
            .is_empty());
        assert!(!e.can_administer(&w.editor.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_access() {
        let w = world().await;
        let ghost = UserId::new("ghost");

        assert!(!w
            .engine
            .can_access_resource(&ghost, &w.resource.id)
            .await
            .unwrap());
        assert!(w
            .engine
            .accessible_resources_for_user(&ghost)
            .await
            .unwrap()
            .is_empty());
        assert!(!w.engine.can_administer(&ghost).await.unwrap());
    }

    #[tokio::test]
    async fn test_access_ignores_slot_granularity() {
        let w = world().await;
        grant(&w, &[25]).await;

        assert!(w
            .engine
            .can_access_resource(&w.editor.id, &w.resource.id)
            .await
            .unwrap());
        assert!(!w
            .engine
            .can_edit_slot_in_resource(&w.editor.id, &w.resource.id, 1)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_out_of_range_slot_never_editable() {
        let w = world().await;
        for slot in [0, 26, -1, i64::MAX] {
            assert!(!w
                .engine
                .can_edit_slot_in_resource(&w.admin.id, &w.resource.id, slot)
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn test_accessible_resources_ordering() {
        let w = world().await;
        let older = Resource::new("Advent 2023", "advent-2023", 2023);
        let newer = Resource::new("Advent 2025", "advent-2025", 2025);
        w.store.upsert_resource(&older).await.unwrap();
        w.store.upsert_resource(&newer).await.unwrap();
        grant(&w, &[1]).await;
        w.store
            .insert_permission(&Permission::new(
                w.editor.id.clone(),
                older.id.clone(),
                SlotSet::from_requested(&[2]).unwrap(),
                0,
            ))
            .await
            .unwrap();

        let admin_view: Vec<i32> = w
            .engine
            .accessible_resources_for_user(&w.admin.id)
            .await
            .unwrap()
            .iter()
            .map(|r| r.year)
            .collect();
        assert_eq!(admin_view, vec![2025, 2024, 2023]);

        let editor_view: Vec<i32> = w
            .engine
            .accessible_resources_for_user(&w.editor.id)
            .await
            .unwrap()
            .iter()
            .map(|r| r.year)
            .collect();
        assert_eq!(editor_view, vec![2024, 2023]);

        assert_eq!(
            w.engine.session_slots(&w.editor.id).await.unwrap().to_vec(),
            vec![1, 2]
        );
        assert_eq!(
            w.engine.session_slots(&w.admin.id).await.unwrap(),
            SlotSet::full()
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_slot_bound_fidelity(granted in valid_slots()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let w = world().await;
                grant(&w, &granted).await;

                for slot in 1i64..=25 {
                    let can = w
                        .engine
                        .can_edit_slot_in_resource(&w.editor.id, &w.resource.id, slot)
                        .await
                        .unwrap();
                    assert_eq!(can, granted.contains(&slot), "slot {}", slot);
                }
            });
        }

        #[test]
        fn test_grant_answers_any_slot(case: GrantProbe) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let w = world().await;
                grant(&w, &case.slots).await;

                let editor = w
                    .engine
                    .can_edit_slot_in_resource(&w.editor.id, &w.resource.id, case.probe)
                    .await
                    .unwrap();
                assert_eq!(editor, case.expected());

                let admin = w
                    .engine
                    .can_edit_slot_in_resource(&w.admin.id, &w.resource.id, case.probe)
                    .await
                    .unwrap();
                assert_eq!(admin, (1..=25).contains(&case.probe));
            });
        }
    }
}
