//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a store seeded with one admin,
//! one editor and three resources, both accounts holding a known password.

use slotguard_core::{now_millis, PasswordManager, Permission, Resource, Role, SlotSet, User};
use slotguard_store::{CredentialStore, InsertResult};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const EDITOR_EMAIL: &str = "editor@example.com";

/// Password set on every seeded account. Satisfies the password policy.
pub const PASSWORD: &str = "Passw0rd!";

/// A password manager with minimal Argon2 cost, for fast tests.
pub fn cheap_passwords() -> PasswordManager {
    PasswordManager::with_params(8, 1, 1).expect("minimal argon2 parameters are valid")
}

/// A seeded store and the records in it.
pub struct Seeded<S: CredentialStore> {
    pub store: S,
    pub admin: User,
    pub editor: User,
    /// Newest year first: 2025, 2024, 2023.
    pub resources: Vec<Resource>,
}

impl<S: CredentialStore> Seeded<S> {
    /// Seed `store`. Panics if the store rejects any record.
    pub async fn new(store: S) -> Self {
        let passwords = cheap_passwords();
        let now = now_millis();

        let mut accounts = Vec::new();
        for (username, email, role) in [
            ("admin", ADMIN_EMAIL, Role::Admin),
            ("editor", EDITOR_EMAIL, Role::Editor),
        ] {
            let mut user = User::new(username, email, role, now);
            store.insert_user(&user).await.expect("insert seeded user");

            let hash = passwords.hash(PASSWORD).expect("hash seeded password");
            store
                .set_password_hash(&user.id, &hash, now)
                .await
                .expect("set seeded password");
            user.password_hash = Some(hash);
            accounts.push(user);
        }
        let editor = accounts.pop().expect("editor seeded");
        let admin = accounts.pop().expect("admin seeded");

        let mut resources = Vec::new();
        for year in [2025, 2024, 2023] {
            let resource = Resource::new(
                format!("Advent {}", year),
                format!("advent-{}", year),
                year,
            );
            store
                .upsert_resource(&resource)
                .await
                .expect("insert seeded resource");
            resources.push(resource);
        }

        Self {
            store,
            admin,
            editor,
            resources,
        }
    }

    /// Grant the seeded editor `slots` on `resource` directly in the store.
    pub async fn grant(&self, resource: &Resource, slots: &[i64]) -> Permission {
        let slots = SlotSet::from_requested(slots).expect("valid slot list");
        let permission = Permission::new(
            self.editor.id.clone(),
            resource.id.clone(),
            slots,
            now_millis(),
        );
        match self
            .store
            .insert_permission(&permission)
            .await
            .expect("insert grant")
        {
            InsertResult::Inserted => permission,
            InsertResult::Conflict { existing } => panic!("editor already holds {}", existing),
        }
    }
}
