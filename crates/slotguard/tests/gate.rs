//! Request-level flows through the Gate.

use std::time::Duration;

use anyhow::Result;
use proptest::prelude::*;
use slotguard::core::{Resource, Role, User};
use slotguard::store::{CredentialStore, MemoryStore, SqliteStore};
use slotguard::{Gate, GateConfig, GateError, UserUpdate};
use slotguard_testkit::generators::{email, password};
use slotguard_testkit::{cheap_passwords, Seeded, ADMIN_EMAIL, EDITOR_EMAIL, PASSWORD};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Harness {
    gate: Gate<MemoryStore>,
    admin: User,
    editor: User,
    resources: Vec<Resource>,
    admin_session: String,
    editor_session: String,
}

async fn harness_with(config: GateConfig) -> Result<Harness> {
    init_tracing();
    let Seeded {
        store,
        admin,
        editor,
        resources,
    } = Seeded::new(MemoryStore::new()).await;
    let gate = Gate::with_password_manager(store, config, cheap_passwords());

    let admin_session = gate.login(ADMIN_EMAIL, PASSWORD).await?.token;
    let editor_session = gate.login(EDITOR_EMAIL, PASSWORD).await?.token;
    Ok(Harness {
        gate,
        admin,
        editor,
        resources,
        admin_session,
        editor_session,
    })
}

async fn harness() -> Result<Harness> {
    harness_with(GateConfig::default()).await
}

fn token_of(url: &str) -> &str {
    url.split("token=").nth(1).unwrap_or_default()
}

#[tokio::test]
async fn test_provision_and_first_login() -> Result<()> {
    let h = harness().await?;
    let admin = Some(h.admin_session.as_str());

    let (user, link) = h
        .gate
        .provision_user(admin, "hanako@example.com", Role::Editor)
        .await?;
    assert_eq!(user.username, "hanako");
    assert!(!user.has_password);
    assert!(link
        .url
        .starts_with("http://localhost:3000/auth/first-login?token="));
    let token = token_of(&link.url);
    assert_eq!(token.len(), 64);

    let holder = h.gate.verify_token(token).await?;
    assert_eq!(holder.email, "hanako@example.com");

    // Policy and confirmation are checked before the token is touched
    let err = h
        .gate
        .set_password(token, "Passw0rd!", "Passw0rd?")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation");
    let err = h.gate.set_password(token, "weak", "weak").await.unwrap_err();
    assert_eq!(err.status(), 400);

    h.gate.set_password(token, "N3w-Passw0rd!", "N3w-Passw0rd!").await?;
    let err = h
        .gate
        .set_password(token, "N3w-Passw0rd!", "N3w-Passw0rd!")
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::TokenInvalid));

    let session = h.gate.login("hanako@example.com", "N3w-Passw0rd!").await?;
    assert_eq!(session.claims.role, Role::Editor);
    assert!(session.claims.allowed_slots.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_provision_conflicts_and_validation() -> Result<()> {
    let h = harness().await?;
    let admin = Some(h.admin_session.as_str());

    let err = h
        .gate
        .provision_user(admin, EDITOR_EMAIL, Role::Editor)
        .await
        .unwrap_err();
    assert_eq!(err.status(), 409);

    // Same local part, different domain: the derived username clashes
    let err = h
        .gate
        .provision_user(admin, "editor@elsewhere.org", Role::Editor)
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Conflict(_)));

    let err = h
        .gate
        .provision_user(admin, "not-an-email", Role::Editor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation");
    Ok(())
}

#[tokio::test]
async fn test_reset_and_expired_links() -> Result<()> {
    let h = harness().await?;
    let admin = Some(h.admin_session.as_str());

    let (user, first) = h
        .gate
        .provision_user(admin, "kenji@example.com", Role::Editor)
        .await?;
    let second = h.gate.reset_token(admin, &user.id).await?;

    let err = h.gate.verify_token(token_of(&first.url)).await.unwrap_err();
    assert!(matches!(err, GateError::TokenInvalid));
    h.gate.verify_token(token_of(&second.url)).await?;

    // A gate whose tokens are born expired
    let h = harness_with(GateConfig::default().with_token_ttl_ms(-1_000)).await?;
    let admin = Some(h.admin_session.as_str());
    let (_, link) = h
        .gate
        .provision_user(admin, "late@example.com", Role::Editor)
        .await?;
    let err = h
        .gate
        .set_password(token_of(&link.url), "Passw0rd!", "Passw0rd!")
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::TokenExpired));
    assert_eq!(err.status(), 400);
    Ok(())
}

#[tokio::test]
async fn test_guards() -> Result<()> {
    let h = harness().await?;
    let editor = Some(h.editor_session.as_str());

    let unauthenticated = h.gate.list_users(None).await.unwrap_err();
    assert_eq!(unauthenticated.status(), 401);

    let forbidden = h.gate.list_users(editor).await.unwrap_err();
    assert_eq!(forbidden.status(), 403);
    assert_ne!(unauthenticated.to_string(), forbidden.to_string());

    let tampered = format!("{}00", h.admin_session);
    let err = h.gate.list_users(Some(&tampered)).await.unwrap_err();
    assert_eq!(err.kind(), "unauthenticated");

    // Role is checked before the slot list is looked at
    let err = h
        .gate
        .create_permission(editor, &h.editor.id, &h.resources[0].id, &[0, 99])
        .await
        .unwrap_err();
    assert_eq!(err.status(), 403);

    let err = h
        .gate
        .login(ADMIN_EMAIL, "Wrong-passw0rd!")
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::InvalidCredentials));
    Ok(())
}

#[tokio::test]
async fn test_permission_flow() -> Result<()> {
    let h = harness().await?;
    let admin = Some(h.admin_session.as_str());
    let editor = Some(h.editor_session.as_str());
    let resource = &h.resources[1];

    assert!(!h.gate.can_access_resource(editor, &resource.id).await?);

    let p = h
        .gate
        .create_permission(admin, &h.editor.id, &resource.id, &[1, 2, 3])
        .await?;
    for slot in 1..=3 {
        assert!(h.gate.can_edit_slot(editor, &resource.id, slot).await?);
    }
    assert!(!h.gate.can_edit_slot(editor, &resource.id, 4).await?);

    let err = h
        .gate
        .create_permission(admin, &h.editor.id, &resource.id, &[9])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "permission_conflict");
    assert_eq!(err.status(), 409);

    h.gate
        .update_permission(admin, &h.editor.id, &p.id, &[5])
        .await?;
    assert_eq!(
        h.gate.allowed_slots(editor, &resource.id).await?.to_vec(),
        vec![5]
    );
    assert!(!h.gate.can_edit_slot(editor, &resource.id, 1).await?);

    let bad_lists: [&[i64]; 4] = [&[0], &[26], &[3, 3], &[]];
    for bad in bad_lists {
        let err = h
            .gate
            .update_permission(admin, &h.editor.id, &p.id, bad)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400, "{:?}", bad);
    }

    let visible = h.gate.accessible_resources(editor).await?;
    assert_eq!(visible, vec![resource.clone()]);
    let all = h.gate.accessible_resources(admin).await?;
    assert_eq!(all.len(), 3);

    let listed = h.gate.list_permissions(admin, &h.editor.id).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].1.id, resource.id);

    h.gate
        .delete_permission(admin, &h.editor.id, &p.id)
        .await?;
    assert!(!h.gate.can_access_resource(editor, &resource.id).await?);

    // Granting to an admin makes no sense
    let err = h
        .gate
        .create_permission(admin, &h.admin.id, &resource.id, &[1])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "bad_request");
    Ok(())
}

#[tokio::test]
async fn test_user_administration() -> Result<()> {
    let h = harness().await?;
    let admin = Some(h.admin_session.as_str());
    h.gate
        .create_permission(admin, &h.editor.id, &h.resources[0].id, &[1])
        .await?;
    // Seeded accounts and the newcomer must not share a creation millisecond
    tokio::time::sleep(Duration::from_millis(5)).await;
    let (newcomer, _) = h
        .gate
        .provision_user(admin, "newcomer@example.com", Role::Editor)
        .await?;

    let users = h.gate.list_users(admin).await?;
    assert_eq!(users.len(), 3);
    assert_eq!(users[0].id, newcomer.id, "newest first");
    let listed_editor = users.iter().find(|u| u.id == h.editor.id).unwrap();
    assert!(listed_editor.has_password);
    assert_eq!(listed_editor.resources.len(), 1);

    let err = h
        .gate
        .update_user(
            admin,
            &newcomer.id,
            UserUpdate {
                username: Some("no spaces".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation");

    let err = h
        .gate
        .update_user(
            admin,
            &newcomer.id,
            UserUpdate {
                email: Some(EDITOR_EMAIL.into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), 409);

    let updated = h
        .gate
        .update_user(
            admin,
            &newcomer.id,
            UserUpdate {
                username: Some("new_comer".into()),
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.username, "new_comer");
    assert_eq!(updated.role, Role::Admin);

    let err = h.gate.delete_user(admin, &h.admin.id).await.unwrap_err();
    assert_eq!(err.status(), 400);

    h.gate.delete_user(admin, &h.editor.id).await?;
    assert!(h
        .gate
        .store()
        .list_permissions_for_user(&h.editor.id)
        .await?
        .is_empty());
    let err = h
        .gate
        .accessible_resources(Some(h.editor_session.as_str()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), 401);

    let err = h.gate.get_user(admin, &h.editor.id).await.unwrap_err();
    assert_eq!(err.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_update_user_trims_email() -> Result<()> {
    let h = harness().await?;
    let admin = Some(h.admin_session.as_str());
    let (newcomer, _) = h
        .gate
        .provision_user(admin, "  newcomer@example.com ", Role::Editor)
        .await?;
    assert_eq!(newcomer.email, "newcomer@example.com");

    let padded = |email: &str| UserUpdate {
        email: Some(format!(" {} ", email)),
        ..Default::default()
    };

    // A padded copy of a taken address still collides
    let err = h
        .gate
        .update_user(admin, &newcomer.id, padded(EDITOR_EMAIL))
        .await
        .unwrap_err();
    assert_eq!(err.status(), 409);

    let updated = h
        .gate
        .update_user(admin, &newcomer.id, padded("moved@example.com"))
        .await?;
    assert_eq!(updated.email, "moved@example.com");
    let stored = h.gate.store().get_user(&newcomer.id).await?.unwrap();
    assert_eq!(stored.email, "moved@example.com");
    Ok(())
}

#[tokio::test]
async fn test_own_account() -> Result<()> {
    let h = harness().await?;
    let editor = Some(h.editor_session.as_str());

    let err = h
        .gate
        .change_password(editor, "Wrong-passw0rd!", "Fresh!passw0rd1", "Fresh!passw0rd1")
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::InvalidCredentials));

    let err = h
        .gate
        .change_password(editor, PASSWORD, PASSWORD, PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation");

    h.gate
        .change_password(editor, PASSWORD, "Fresh!passw0rd1", "Fresh!passw0rd1")
        .await?;
    assert!(h.gate.login(EDITOR_EMAIL, PASSWORD).await.is_err());
    h.gate.login(EDITOR_EMAIL, "Fresh!passw0rd1").await?;

    let me = h.gate.update_own_profile(editor, Some("Ed Itor")).await?;
    assert_eq!(me.display_name.as_deref(), Some("Ed Itor"));
    let me = h.gate.update_own_profile(editor, Some("")).await?;
    assert_eq!(me.display_name, None);

    let too_long = "x".repeat(51);
    let err = h
        .gate
        .update_own_profile(editor, Some(&too_long))
        .await
        .unwrap_err();
    assert_eq!(err.status(), 400);
    Ok(())
}

#[tokio::test]
async fn test_resource_registry() -> Result<()> {
    let h = harness().await?;
    let admin = Some(h.admin_session.as_str());
    let editor = Some(h.editor_session.as_str());

    let fresh = Resource::new("Advent 2026", "advent-2026", 2026);
    h.gate.register_resource(&fresh).await?;
    h.gate
        .create_permission(admin, &h.editor.id, &fresh.id, &[24, 25])
        .await?;
    assert!(h.gate.can_edit_slot(editor, &fresh.id, 25).await?);

    let clash = Resource::new("Copy", "advent-2026", 2026);
    assert_eq!(h.gate.register_resource(&clash).await.unwrap_err().status(), 409);

    h.gate.remove_resource(&fresh.id).await?;
    assert!(!h.gate.can_access_resource(editor, &fresh.id).await?);
    assert_eq!(
        h.gate.remove_resource(&fresh.id).await.unwrap_err().status(),
        404
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bootstrap_survives_restart() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("slotguard.db");
    let config = GateConfig::default();

    let link = {
        let Seeded { store, .. } = Seeded::new(SqliteStore::open(&path)?).await;
        let gate = Gate::with_password_manager(store, config.clone(), cheap_passwords());
        let admin = gate.login(ADMIN_EMAIL, PASSWORD).await?.token;
        let (_, link) = gate
            .provision_user(Some(admin.as_str()), "persist@example.com", Role::Editor)
            .await?;
        link
    };

    let gate = Gate::with_password_manager(SqliteStore::open(&path)?, config, cheap_passwords());
    let token = token_of(&link.url);
    gate.set_password(token, "Passw0rd!", "Passw0rd!").await?;
    let session = gate.login("persist@example.com", "Passw0rd!").await?;
    assert_eq!(session.claims.id, link.user_id);
    Ok(())
}

#[tokio::test]
async fn test_user_summary_never_exposes_credentials() -> Result<()> {
    let h = harness().await?;
    let users = h.gate.list_users(Some(h.admin_session.as_str())).await?;
    let json = serde_json::to_value(&users[0])?;

    assert!(json.get("hasPassword").is_some());
    assert!(json.get("displayName").is_some());
    assert!(json.get("passwordHash").is_none());
    assert!(json.get("bootstrapToken").is_none());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_any_provisioned_account_can_bootstrap(address in email(), secret in password()) {
        let local = address.split('@').next().unwrap_or_default().to_string();
        prop_assume!(local != "admin" && local != "editor");

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let h = harness().await?;
            let (user, link) = h
                .gate
                .provision_user(Some(h.admin_session.as_str()), &address, Role::Editor)
                .await?;
            assert_eq!(user.username, local);

            h.gate
                .set_password(token_of(&link.url), &secret, &secret)
                .await?;
            let session = h.gate.login(&address, &secret).await?;
            assert_eq!(session.claims.id, user.id);
            anyhow::Ok(())
        })
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    }
}
