//! The Gate: request-level API for Slotguard.
//!
//! The Gate ties the store, the decision engine, the token lifecycle and
//! sessions together behind the operations an application exposes. Every
//! protected operation takes the caller's session token and runs its guard
//! (`require_auth` or `require_admin`) before looking at any input.

use std::sync::Arc;

use serde::Serialize;
use slotguard_core::validation::{
    normalize_display_name, username_from_email, validate_email, validate_new_password,
    validate_username,
};
use slotguard_core::{
    now_millis, PasswordManager, Permission, PermissionId, Resource, ResourceId, Role,
    SessionClaims, SlotSet, User, UserId, ValidationError,
};
use slotguard_credentials::{
    Session, SessionAugmenter, SessionSigner, TokenHolder, TokenLifecycleManager,
};
use slotguard_perms::{AccessDecisionEngine, PermissionAdmin};
use slotguard_store::{CredentialStore, UniqueField, UserWriteResult};

use crate::config::GateConfig;
use crate::error::{GateError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Views
// ─────────────────────────────────────────────────────────────────────────────

/// A user as shown to administrators. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub display_name: Option<String>,
    pub email: String,
    pub role: Role,
    pub has_password: bool,
    pub created_at: i64,
    /// Resources the user holds grants on. Empty for admins.
    pub resources: Vec<Resource>,
}

impl UserSummary {
    fn new(user: User, resources: Vec<Resource>) -> Self {
        Self {
            has_password: user.has_password(),
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            resources,
        }
    }
}

/// A first-login link for a provisioned or reset account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstLoginLink {
    pub user_id: UserId,
    pub url: String,
    pub expires_at: i64,
}

/// Fields an administrator may change on an account. `None` leaves the
/// field as it is.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Gate
// ─────────────────────────────────────────────────────────────────────────────

/// The main Gate struct.
pub struct Gate<S: CredentialStore> {
    store: Arc<S>,
    config: GateConfig,
    passwords: PasswordManager,
    tokens: TokenLifecycleManager<S>,
    engine: AccessDecisionEngine<S>,
    grants: PermissionAdmin<S>,
    sessions: SessionAugmenter<S>,
}

impl<S: CredentialStore> Gate<S> {
    /// Create a gate over `store` with the default password hasher.
    pub fn new(store: S, config: GateConfig) -> Self {
        Self::with_password_manager(store, config, PasswordManager::new())
    }

    /// Create a gate with a specific password hasher.
    pub fn with_password_manager(store: S, config: GateConfig, passwords: PasswordManager) -> Self {
        let store = Arc::new(store);
        let signer =
            SessionSigner::new(config.session_key.clone()).with_ttl_ms(config.session_ttl_ms);

        Self {
            tokens: TokenLifecycleManager::new(Arc::clone(&store))
                .with_ttl_ms(config.token_ttl_ms),
            engine: AccessDecisionEngine::new(Arc::clone(&store)),
            grants: PermissionAdmin::new(Arc::clone(&store)),
            sessions: SessionAugmenter::new(Arc::clone(&store), passwords.clone(), signer),
            passwords,
            config,
            store,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The decision engine, for callers that already hold a user id.
    pub fn engine(&self) -> &AccessDecisionEngine<S> {
        &self.engine
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Guards
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve the caller's session, failing with `Unauthenticated`.
    ///
    /// A signed session for an account that has since been deleted is
    /// refused too.
    pub async fn require_auth(&self, session: Option<&str>) -> Result<SessionClaims> {
        let token =
            session.ok_or_else(|| GateError::Unauthenticated("sign in required".into()))?;
        let claims = self.sessions.authenticate(token)?;

        if self.store.get_user(&claims.id).await?.is_none() {
            return Err(GateError::Unauthenticated("account no longer exists".into()));
        }
        Ok(claims)
    }

    /// [`require_auth`](Self::require_auth), then require the admin role as
    /// currently stored.
    pub async fn require_admin(&self, session: Option<&str>) -> Result<SessionClaims> {
        let claims = self.require_auth(session).await?;
        if !self.engine.can_administer(&claims.id).await? {
            tracing::warn!(user = %claims.id, "admin operation refused");
            return Err(GateError::Forbidden("administrator role required".into()));
        }
        Ok(claims)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Provisioning and bootstrap
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an account from an email address and issue its first-login
    /// link. The username is the email's local part.
    pub async fn provision_user(
        &self,
        session: Option<&str>,
        email: &str,
        role: Role,
    ) -> Result<(UserSummary, FirstLoginLink)> {
        self.require_admin(session).await?;
        let email = email.trim();
        validate_email(email)?;
        let username = username_from_email(email)?;

        let user = User::new(username, email, role, now_millis());
        match self.store.insert_user(&user).await? {
            UserWriteResult::Written => {}
            UserWriteResult::Duplicate(field) => return Err(duplicate(field)),
            UserWriteResult::NotFound => return Err(GateError::NotFound("user")),
        }

        let link = self.issue_link(&user.id).await?;
        tracing::info!(user = %user.id, role = %role, "user provisioned");
        Ok((UserSummary::new(user, Vec::new()), link))
    }

    /// Replace a user's bootstrap token with a fresh one. The previous link
    /// stops working immediately.
    pub async fn reset_token(
        &self,
        session: Option<&str>,
        user_id: &UserId,
    ) -> Result<FirstLoginLink> {
        self.require_admin(session).await?;
        let link = self.issue_link(user_id).await?;
        tracing::info!(user = %user_id, "bootstrap token reset");
        Ok(link)
    }

    async fn issue_link(&self, user_id: &UserId) -> Result<FirstLoginLink> {
        let issued = self.tokens.issue(user_id).await?;
        Ok(FirstLoginLink {
            user_id: user_id.clone(),
            url: self.config.first_login_url(issued.token.as_str()),
            expires_at: issued.expires_at,
        })
    }

    /// Check a first-login token and say whose it is.
    pub async fn verify_token(&self, token: &str) -> Result<TokenHolder> {
        Ok(self.tokens.verify(token).await?)
    }

    /// Set a password through a first-login token, consuming it.
    pub async fn set_password(&self, token: &str, password: &str, confirm: &str) -> Result<()> {
        validate_new_password(password, confirm)?;
        // Fail fast on a dead token before paying for the hash
        self.tokens.verify(token).await?;

        let hash = self.passwords.hash(password)?;
        self.tokens.consume(token, &hash).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions and own account
    // ─────────────────────────────────────────────────────────────────────────

    /// Log in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        Ok(self.sessions.login(email.trim(), password).await?)
    }

    /// Change the caller's own password.
    pub async fn change_password(
        &self,
        session: Option<&str>,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> Result<()> {
        let claims = self.require_auth(session).await?;
        validate_new_password(new, confirm)?;
        if new == current {
            return Err(ValidationError::PasswordUnchanged.into());
        }

        let user = self.load_user(&claims.id).await?;
        let verified = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| self.passwords.verify(current, hash));
        if !verified {
            tracing::warn!(user = %user.id, "password change with wrong current password");
            return Err(GateError::InvalidCredentials);
        }

        let hash = self.passwords.hash(new)?;
        if !self.store.set_password_hash(&user.id, &hash, now_millis()).await? {
            return Err(GateError::NotFound("user"));
        }
        tracing::info!(user = %user.id, "password changed");
        Ok(())
    }

    /// Set or clear the caller's display name. An empty name clears it.
    pub async fn update_own_profile(
        &self,
        session: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<UserSummary> {
        let claims = self.require_auth(session).await?;
        let display_name = normalize_display_name(display_name.map(str::trim))?;

        let mut user = self.load_user(&claims.id).await?;
        user.display_name = display_name;
        user.updated_at = now_millis();
        self.write_user(&user).await?;
        self.summarize(user).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User administration
    // ─────────────────────────────────────────────────────────────────────────

    /// Every user, newest first.
    pub async fn list_users(&self, session: Option<&str>) -> Result<Vec<UserSummary>> {
        self.require_admin(session).await?;
        let mut summaries = Vec::new();
        for user in self.store.list_users().await? {
            summaries.push(self.summarize(user).await?);
        }
        Ok(summaries)
    }

    pub async fn get_user(&self, session: Option<&str>, user_id: &UserId) -> Result<UserSummary> {
        self.require_admin(session).await?;
        let user = self.load_user(user_id).await?;
        self.summarize(user).await
    }

    /// Change a user's username, email or role.
    pub async fn update_user(
        &self,
        session: Option<&str>,
        user_id: &UserId,
        update: UserUpdate,
    ) -> Result<UserSummary> {
        self.require_admin(session).await?;
        if let Some(username) = &update.username {
            validate_username(username)?;
        }
        let email = update.email.as_deref().map(str::trim);
        if let Some(email) = email {
            validate_email(email)?;
        }

        let mut user = self.load_user(user_id).await?;
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(email) = email {
            user.email = email.to_string();
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        user.updated_at = now_millis();

        self.write_user(&user).await?;
        tracing::info!(user = %user.id, role = %user.role, "user updated");
        self.summarize(user).await
    }

    /// Delete a user and their grants. Administrators cannot delete
    /// themselves.
    pub async fn delete_user(&self, session: Option<&str>, user_id: &UserId) -> Result<()> {
        let claims = self.require_admin(session).await?;
        if &claims.id == user_id {
            return Err(GateError::BadRequest("cannot delete your own account".into()));
        }
        if !self.store.delete_user(user_id).await? {
            return Err(GateError::NotFound("user"));
        }
        tracing::info!(user = %user_id, "user deleted");
        Ok(())
    }

    async fn load_user(&self, user_id: &UserId) -> Result<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(GateError::NotFound("user"))
    }

    async fn write_user(&self, user: &User) -> Result<()> {
        match self.store.update_user(user).await? {
            UserWriteResult::Written => Ok(()),
            UserWriteResult::NotFound => Err(GateError::NotFound("user")),
            UserWriteResult::Duplicate(field) => Err(duplicate(field)),
        }
    }

    async fn summarize(&self, user: User) -> Result<UserSummary> {
        let resources = self.store.resources_for_user(&user.id).await?;
        Ok(UserSummary::new(user, resources))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permission administration
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_permission(
        &self,
        session: Option<&str>,
        user_id: &UserId,
        resource_id: &ResourceId,
        slots: &[i64],
    ) -> Result<Permission> {
        let claims = self.require_admin(session).await?;
        Ok(self
            .grants
            .create(&claims.id, user_id, resource_id, slots)
            .await?)
    }

    pub async fn update_permission(
        &self,
        session: Option<&str>,
        user_id: &UserId,
        permission_id: &PermissionId,
        slots: &[i64],
    ) -> Result<Permission> {
        let claims = self.require_admin(session).await?;
        Ok(self
            .grants
            .update(&claims.id, user_id, permission_id, slots)
            .await?)
    }

    pub async fn delete_permission(
        &self,
        session: Option<&str>,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> Result<()> {
        let claims = self.require_admin(session).await?;
        Ok(self
            .grants
            .delete(&claims.id, user_id, permission_id)
            .await?)
    }

    pub async fn list_permissions(
        &self,
        session: Option<&str>,
        user_id: &UserId,
    ) -> Result<Vec<(Permission, Resource)>> {
        let claims = self.require_admin(session).await?;
        Ok(self.grants.list(&claims.id, user_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Decisions for the caller
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn can_access_resource(
        &self,
        session: Option<&str>,
        resource_id: &ResourceId,
    ) -> Result<bool> {
        let claims = self.require_auth(session).await?;
        Ok(self.engine.can_access_resource(&claims.id, resource_id).await?)
    }

    pub async fn can_edit_slot(
        &self,
        session: Option<&str>,
        resource_id: &ResourceId,
        slot: i64,
    ) -> Result<bool> {
        let claims = self.require_auth(session).await?;
        Ok(self
            .engine
            .can_edit_slot_in_resource(&claims.id, resource_id, slot)
            .await?)
    }

    pub async fn allowed_slots(
        &self,
        session: Option<&str>,
        resource_id: &ResourceId,
    ) -> Result<SlotSet> {
        let claims = self.require_auth(session).await?;
        Ok(self
            .engine
            .allowed_slots_for_resource(&claims.id, resource_id)
            .await?)
    }

    pub async fn accessible_resources(&self, session: Option<&str>) -> Result<Vec<Resource>> {
        let claims = self.require_auth(session).await?;
        Ok(self.engine.accessible_resources_for_user(&claims.id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resource registry
    // ─────────────────────────────────────────────────────────────────────────

    /// Register or update a resource. Called by the application that owns
    /// resources, not by end users.
    pub async fn register_resource(&self, resource: &Resource) -> Result<()> {
        self.store.upsert_resource(resource).await?;
        tracing::debug!(resource = %resource.id, slug = %resource.slug, "resource registered");
        Ok(())
    }

    /// Remove a resource and every grant on it.
    pub async fn remove_resource(&self, resource_id: &ResourceId) -> Result<()> {
        if !self.store.delete_resource(resource_id).await? {
            return Err(GateError::NotFound("resource"));
        }
        tracing::info!(resource = %resource_id, "resource removed");
        Ok(())
    }
}

fn duplicate(field: UniqueField) -> GateError {
    match field {
        UniqueField::Email => GateError::Conflict("email already in use".into()),
        UniqueField::Username => GateError::Conflict("username already in use".into()),
    }
}
