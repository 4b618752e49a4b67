//! SQLite implementation of the CredentialStore trait.
//!
//! This is the primary storage backend for Slotguard. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use slotguard_core::{
    BootstrapToken, Permission, PermissionId, Resource, ResourceId, Role, SlotSet, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{ConsumeOutcome, CredentialStore, InsertResult, UniqueField, UserWriteResult};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Backend(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("spawn_blocking failed: {}", e)))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

const USER_COLUMNS: &str = "id, username, display_name, email, role, password_hash,
    bootstrap_token, bootstrap_token_expires_at, created_at, updated_at";

const RESOURCE_COLUMNS: &str = "id, name, slug, year, is_published";

/// A users row as stored, before domain validation.
struct UserRow {
    id: String,
    username: String,
    display_name: Option<String>,
    email: String,
    role: String,
    password_hash: Option<String>,
    bootstrap_token: Option<String>,
    bootstrap_token_expires_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get("id")?,
        username: row.get("username")?,
        display_name: row.get("display_name")?,
        email: row.get("email")?,
        role: row.get("role")?,
        password_hash: row.get("password_hash")?,
        bootstrap_token: row.get("bootstrap_token")?,
        bootstrap_token_expires_at: row.get("bootstrap_token_expires_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| StoreError::InvalidData(format!("user {}: {}", row.id, e)))?;

        let bootstrap_token = row
            .bootstrap_token
            .as_deref()
            .map(BootstrapToken::from_hex)
            .transpose()
            .map_err(|e| StoreError::InvalidData(format!("user {}: {}", row.id, e)))?;

        Ok(User {
            id: UserId::new(row.id),
            username: row.username,
            display_name: row.display_name,
            email: row.email,
            role,
            password_hash: row.password_hash,
            bootstrap_token,
            bootstrap_token_expires_at: row.bootstrap_token_expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn row_to_resource(row: &rusqlite::Row<'_>) -> rusqlite::Result<Resource> {
    Ok(Resource {
        id: ResourceId::new(row.get::<_, String>("id")?),
        name: row.get("name")?,
        slug: row.get("slug")?,
        year: row.get("year")?,
        is_published: row.get("is_published")?,
    })
}

/// A permissions row with the slot column still CBOR-encoded.
struct PermissionRow {
    id: String,
    user_id: String,
    resource_id: String,
    allowed_slots: Vec<u8>,
    created_at: i64,
    updated_at: i64,
}

fn row_to_permission(row: &rusqlite::Row<'_>) -> rusqlite::Result<PermissionRow> {
    Ok(PermissionRow {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        resource_id: row.get("resource_id")?,
        allowed_slots: row.get("allowed_slots")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl TryFrom<PermissionRow> for Permission {
    type Error = StoreError;

    fn try_from(row: PermissionRow) -> Result<Self> {
        let allowed_slots = decode_slots(&row.allowed_slots)
            .map_err(|e| StoreError::InvalidData(format!("permission {}: {}", row.id, e)))?;

        Ok(Permission {
            id: PermissionId::new(row.id),
            user_id: UserId::new(row.user_id),
            resource_id: ResourceId::new(row.resource_id),
            allowed_slots,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// Slot sets are stored as a CBOR array of slot numbers
fn encode_slots(slots: &SlotSet) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(&slots.to_vec(), &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_slots(bytes: &[u8]) -> std::result::Result<SlotSet, String> {
    let numbers: Vec<u8> = ciborium::from_reader(bytes).map_err(|e| e.to_string())?;
    let set = SlotSet::from_stored(&numbers).map_err(|e| e.to_string())?;
    if set.is_empty() {
        return Err("empty slot set".to_string());
    }
    Ok(set)
}

/// Find which unique field `user` would collide on, ignoring its own row.
fn duplicate_of(conn: &Connection, user: &User) -> Result<Option<UniqueField>> {
    let email_taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND id != ?2)",
        params![user.email, user.id.as_str()],
        |row| row.get(0),
    )?;
    if email_taken {
        return Ok(Some(UniqueField::Email));
    }

    let username_taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id != ?2)",
        params![user.username, user.id.as_str()],
        |row| row.get(0),
    )?;
    if username_taken {
        return Ok(Some(UniqueField::Username));
    }

    Ok(None)
}

fn query_user(conn: &Connection, where_clause: &str, arg: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, where_clause);
    conn.query_row(&sql, params![arg], row_to_user)
        .optional()?
        .map(User::try_from)
        .transpose()
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn insert_user(&self, user: &User) -> Result<UserWriteResult> {
        let user = user.clone();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(field) = duplicate_of(&tx, &user)? {
                return Ok(UserWriteResult::Duplicate(field));
            }

            tx.execute(
                "INSERT INTO users (
                    id, username, display_name, email, role, password_hash,
                    bootstrap_token, bootstrap_token_expires_at, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    user.id.as_str(),
                    user.username,
                    user.display_name,
                    user.email,
                    user.role.as_str(),
                    user.password_hash,
                    user.bootstrap_token.as_ref().map(|t| t.as_str()),
                    user.bootstrap_token_expires_at,
                    user.created_at,
                    user.updated_at,
                ],
            )?;

            tx.commit()?;
            Ok(UserWriteResult::Written)
        })
        .await
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let id = id.clone();
        self.run(move |conn| query_user(conn, "id", id.as_str())).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        self.run(move |conn| query_user(conn, "email", &email)).await
    }

    async fn get_user_by_token(&self, token: &BootstrapToken) -> Result<Option<User>> {
        let token = token.clone();
        self.run(move |conn| query_user(conn, "bootstrap_token", token.as_str()))
            .await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.run(|conn| {
            let sql = format!(
                "SELECT {} FROM users ORDER BY created_at DESC, id",
                USER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], row_to_user)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter().map(User::try_from).collect()
        })
        .await
    }

    async fn update_user(&self, user: &User) -> Result<UserWriteResult> {
        let user = user.clone();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                params![user.id.as_str()],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(UserWriteResult::NotFound);
            }

            if let Some(field) = duplicate_of(&tx, &user)? {
                return Ok(UserWriteResult::Duplicate(field));
            }

            tx.execute(
                "UPDATE users
                 SET username = ?1, display_name = ?2, email = ?3, role = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    user.username,
                    user.display_name,
                    user.email,
                    user.role.as_str(),
                    user.updated_at,
                    user.id.as_str(),
                ],
            )?;

            tx.commit()?;
            Ok(UserWriteResult::Written)
        })
        .await
    }

    async fn set_bootstrap_token(
        &self,
        id: &UserId,
        token: &BootstrapToken,
        expires_at: i64,
        now: i64,
    ) -> Result<bool> {
        let id = id.clone();
        let token = token.clone();

        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET bootstrap_token = ?1, bootstrap_token_expires_at = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![token.as_str(), expires_at, now, id.as_str()],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn consume_bootstrap_token(
        &self,
        token: &BootstrapToken,
        password_hash: &str,
        now: i64,
    ) -> Result<ConsumeOutcome> {
        let token = token.clone();
        let password_hash = password_hash.to_string();

        self.run(move |conn| {
            // Immediate: take the write lock before reading so a second
            // connection on the same file cannot validate the same token.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let holder: Option<(String, Option<i64>)> = tx
                .query_row(
                    "SELECT id, bootstrap_token_expires_at FROM users WHERE bootstrap_token = ?1",
                    params![token.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((id, expires_at)) = holder else {
                return Ok(ConsumeOutcome::NotFound);
            };

            match expires_at {
                Some(expires_at) if now <= expires_at => {}
                _ => return Ok(ConsumeOutcome::Expired),
            }

            let changed = tx.execute(
                "UPDATE users
                 SET password_hash = ?1, bootstrap_token = NULL,
                     bootstrap_token_expires_at = NULL, updated_at = ?2
                 WHERE id = ?3 AND bootstrap_token = ?4",
                params![password_hash, now, id, token.as_str()],
            )?;
            if changed != 1 {
                return Ok(ConsumeOutcome::NotFound);
            }

            tx.commit()?;
            Ok(ConsumeOutcome::Consumed(UserId::new(id)))
        })
        .await
    }

    async fn set_password_hash(&self, id: &UserId, password_hash: &str, now: i64) -> Result<bool> {
        let id = id.clone();
        let password_hash = password_hash.to_string();

        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
                params![password_hash, now, id.as_str()],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn delete_user(&self, id: &UserId) -> Result<bool> {
        let id = id.clone();

        self.run(move |conn| {
            // Permission rows go with the user via ON DELETE CASCADE
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", params![id.as_str()])?;
            Ok(changed == 1)
        })
        .await
    }

    async fn upsert_resource(&self, resource: &Resource) -> Result<()> {
        let resource = resource.clone();

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let slug_taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM resources WHERE slug = ?1 AND id != ?2)",
                params![resource.slug, resource.id.as_str()],
                |row| row.get(0),
            )?;
            if slug_taken {
                return Err(StoreError::Conflict(format!(
                    "resource slug {} is taken",
                    resource.slug
                )));
            }

            tx.execute(
                "INSERT INTO resources (id, name, slug, year, is_published)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    slug = excluded.slug,
                    year = excluded.year,
                    is_published = excluded.is_published",
                params![
                    resource.id.as_str(),
                    resource.name,
                    resource.slug,
                    resource.year,
                    resource.is_published,
                ],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>> {
        let id = id.clone();

        self.run(move |conn| {
            let sql = format!("SELECT {} FROM resources WHERE id = ?1", RESOURCE_COLUMNS);
            conn.query_row(&sql, params![id.as_str()], row_to_resource)
                .optional()
                .map_err(StoreError::from)
        })
        .await
    }

    async fn list_resources(&self) -> Result<Vec<Resource>> {
        self.run(|conn| {
            let sql = format!(
                "SELECT {} FROM resources ORDER BY year DESC, name ASC",
                RESOURCE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let resources = stmt
                .query_map([], row_to_resource)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(resources)
        })
        .await
    }

    async fn resources_for_user(&self, user_id: &UserId) -> Result<Vec<Resource>> {
        let user_id = user_id.clone();

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.name, r.slug, r.year, r.is_published
                 FROM resources r
                 JOIN permissions p ON p.resource_id = r.id
                 WHERE p.user_id = ?1
                 ORDER BY r.year DESC, r.name ASC",
            )?;
            let resources = stmt
                .query_map(params![user_id.as_str()], row_to_resource)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(resources)
        })
        .await
    }

    async fn delete_resource(&self, id: &ResourceId) -> Result<bool> {
        let id = id.clone();

        self.run(move |conn| {
            let changed =
                conn.execute("DELETE FROM resources WHERE id = ?1", params![id.as_str()])?;
            Ok(changed == 1)
        })
        .await
    }

    async fn insert_permission(&self, permission: &Permission) -> Result<InsertResult> {
        let permission = permission.clone();

        self.run(move |conn| {
            let slots = encode_slots(&permission.allowed_slots)?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM permissions WHERE user_id = ?1 AND resource_id = ?2",
                    params![
                        permission.user_id.as_str(),
                        permission.resource_id.as_str()
                    ],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing) = existing {
                return Ok(InsertResult::Conflict {
                    existing: PermissionId::new(existing),
                });
            }

            let references = [
                ("user", "SELECT 1 FROM users WHERE id = ?1", permission.user_id.as_str()),
                (
                    "resource",
                    "SELECT 1 FROM resources WHERE id = ?1",
                    permission.resource_id.as_str(),
                ),
            ];
            for (what, sql, id) in references {
                let found: Option<i64> = tx
                    .query_row(sql, params![id], |row| row.get(0))
                    .optional()?;
                if found.is_none() {
                    return Err(StoreError::MissingReference(what));
                }
            }

            tx.execute(
                "INSERT INTO permissions (
                    id, user_id, resource_id, allowed_slots, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    permission.id.as_str(),
                    permission.user_id.as_str(),
                    permission.resource_id.as_str(),
                    slots,
                    permission.created_at,
                    permission.updated_at,
                ],
            )?;

            tx.commit()?;
            Ok(InsertResult::Inserted)
        })
        .await
    }

    async fn get_permission(&self, id: &PermissionId) -> Result<Option<Permission>> {
        let id = id.clone();

        self.run(move |conn| {
            conn.query_row(
                "SELECT id, user_id, resource_id, allowed_slots, created_at, updated_at
                 FROM permissions WHERE id = ?1",
                params![id.as_str()],
                row_to_permission,
            )
            .optional()?
            .map(Permission::try_from)
            .transpose()
        })
        .await
    }

    async fn find_permission(
        &self,
        user_id: &UserId,
        resource_id: &ResourceId,
    ) -> Result<Option<Permission>> {
        let user_id = user_id.clone();
        let resource_id = resource_id.clone();

        self.run(move |conn| {
            conn.query_row(
                "SELECT id, user_id, resource_id, allowed_slots, created_at, updated_at
                 FROM permissions WHERE user_id = ?1 AND resource_id = ?2",
                params![user_id.as_str(), resource_id.as_str()],
                row_to_permission,
            )
            .optional()?
            .map(Permission::try_from)
            .transpose()
        })
        .await
    }

    async fn list_permissions_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<(Permission, Resource)>> {
        let user_id = user_id.clone();

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.user_id, p.resource_id, p.allowed_slots, p.created_at,
                        p.updated_at, r.name, r.slug, r.year, r.is_published
                 FROM permissions p
                 JOIN resources r ON r.id = p.resource_id
                 WHERE p.user_id = ?1
                 ORDER BY r.year DESC, r.name ASC",
            )?;

            let rows = stmt
                .query_map(params![user_id.as_str()], |row| {
                    let permission = row_to_permission(row)?;
                    let resource = Resource {
                        id: ResourceId::new(permission.resource_id.clone()),
                        name: row.get("name")?,
                        slug: row.get("slug")?,
                        year: row.get("year")?,
                        is_published: row.get("is_published")?,
                    };
                    Ok((permission, resource))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(permission, resource)| Ok((Permission::try_from(permission)?, resource)))
                .collect()
        })
        .await
    }

    async fn replace_allowed_slots(
        &self,
        id: &PermissionId,
        slots: &SlotSet,
        now: i64,
    ) -> Result<bool> {
        let id = id.clone();
        let slots = slots.clone();

        self.run(move |conn| {
            let encoded = encode_slots(&slots)?;
            let changed = conn.execute(
                "UPDATE permissions SET allowed_slots = ?1, updated_at = ?2 WHERE id = ?3",
                params![encoded, now, id.as_str()],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn delete_permission(&self, id: &PermissionId) -> Result<bool> {
        let id = id.clone();

        self.run(move |conn| {
            let changed =
                conn.execute("DELETE FROM permissions WHERE id = ?1", params![id.as_str()])?;
            Ok(changed == 1)
        })
        .await
    }
}
