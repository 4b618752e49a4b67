//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;
use slotguard_core::now_millis;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(version = CURRENT_VERSION, "schema migrated");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Accounts
        CREATE TABLE users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            display_name TEXT,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL CHECK (role IN ('admin', 'editor')),
            password_hash TEXT,                 -- PHC string, NULL until first login
            bootstrap_token TEXT UNIQUE,        -- 64 hex chars, NULL when none active
            bootstrap_token_expires_at INTEGER, -- Unix ms
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Resources (calendars), owned by the embedding application
        CREATE TABLE resources (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            year INTEGER NOT NULL,
            is_published INTEGER NOT NULL DEFAULT 0
        );

        -- Editor grants, one per (user, resource)
        CREATE TABLE permissions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            resource_id TEXT NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
            allowed_slots BLOB NOT NULL,        -- CBOR array of slot numbers, ascending
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,

            UNIQUE(user_id, resource_id)
        );

        -- Indexes for common queries
        CREATE INDEX idx_permissions_user ON permissions(user_id);
        CREATE INDEX idx_permissions_resource ON permissions(resource_id);
        CREATE INDEX idx_resources_listing ON resources(year DESC, name);
        CREATE INDEX idx_users_created ON users(created_at);
        "#,
    )?;

    Ok(())
}
