//! Permission index: which slots a user holds on which resource.
//!
//! The index is the only reader of permission rows for access decisions. It
//! knows nothing about roles; role handling belongs to the decision engine.

use std::sync::Arc;

use slotguard_core::{Resource, ResourceId, SlotSet, UserId};
use slotguard_store::CredentialStore;

use crate::error::Result;

/// Read-side view of the permission rows in a store.
pub struct PermissionIndex<S: CredentialStore> {
    store: Arc<S>,
}

impl<S: CredentialStore> Clone for PermissionIndex<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: CredentialStore> PermissionIndex<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The slots `user_id` may edit in `resource_id`, or `None` when no
    /// permission row exists for the pair.
    pub async fn slots_for(
        &self,
        user_id: &UserId,
        resource_id: &ResourceId,
    ) -> Result<Option<SlotSet>> {
        Ok(self
            .store
            .find_permission(user_id, resource_id)
            .await?
            .map(|p| p.allowed_slots))
    }

    /// Resources referenced by the user's permission rows, in listing order.
    pub async fn resources_for(&self, user_id: &UserId) -> Result<Vec<Resource>> {
        Ok(self.store.resources_for_user(user_id).await?)
    }

    /// Union of the user's slots across every resource they hold a row for.
    pub async fn slot_union(&self, user_id: &UserId) -> Result<SlotSet> {
        let rows = self.store.list_permissions_for_user(user_id).await?;
        Ok(rows
            .iter()
            .flat_map(|(p, _)| p.allowed_slots.iter())
            .collect())
    }
}
