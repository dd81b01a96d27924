/// SQLite-backed implementation of [`RbacStore`].
///
/// Uses `rusqlite` with the catalog in `permissions`/`roles`, the
/// grant relation in `grants` (unique on the pair), and the matrix
/// cache mirror in a generic `settings` table. Idempotent writes go
/// through `INSERT OR IGNORE` / `ON CONFLICT` upserts so concurrent
/// identical calls converge on one row.
use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use warden_core::{
    CatalogState, EntityKind, GrantDecision, GrantState, NewPermission, NewRole, Permission,
    Role, WardenError,
};

use crate::store::{RbacStore, StoreCounts};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS permissions (
        id             TEXT PRIMARY KEY,
        code           TEXT NOT NULL UNIQUE,
        name           TEXT NOT NULL,
        localized_name TEXT NOT NULL,
        description    TEXT NOT NULL,
        category       TEXT NOT NULL,
        active         INTEGER NOT NULL DEFAULT 1,
        created_at     INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS roles (
        id          TEXT PRIMARY KEY,
        code        TEXT NOT NULL UNIQUE,
        name        TEXT NOT NULL,
        description TEXT NOT NULL,
        active      INTEGER NOT NULL DEFAULT 1,
        created_at  INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS grants (
        role_id       TEXT NOT NULL,
        permission_id TEXT NOT NULL,
        granted       INTEGER NOT NULL,
        updated_at    INTEGER NOT NULL,
        PRIMARY KEY (role_id, permission_id)
    );
    CREATE TABLE IF NOT EXISTS settings (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_grants_role ON grants(role_id);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WardenError> {
        let conn = Connection::open(path.as_ref()).map_err(storage)?;
        conn.execute_batch(&format!("PRAGMA journal_mode=WAL;{SCHEMA}"))
            .map_err(storage)?;
        info!("SqliteStore opened at {:?}", path.as_ref());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self, WardenError> {
        let conn = Connection::open_in_memory().map_err(storage)?;
        conn.execute_batch(SCHEMA).map_err(storage)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

#[async_trait]
impl RbacStore for SqliteStore {
    async fn upsert_permission(
        &self,
        new: NewPermission,
    ) -> Result<(Permission, bool), WardenError> {
        let conn = self.conn.lock().await;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO permissions
                     (id, code, name, localized_name, description, category, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)",
                params![
                    Uuid::new_v4().to_string(),
                    new.code,
                    new.name,
                    new.localized_name,
                    new.description,
                    new.category,
                    Utc::now().timestamp(),
                ],
            )
            .map_err(storage)?
            > 0;
        let perm = conn
            .query_row(
                "SELECT id, code, name, localized_name, description, category, active, created_at
                 FROM permissions WHERE code = ?1",
                params![new.code],
                row_to_permission,
            )
            .map_err(storage)?;
        if inserted {
            debug!("created permission {}", perm.code);
        }
        Ok((perm, inserted))
    }

    async fn upsert_role(&self, new: NewRole) -> Result<(Role, bool), WardenError> {
        let conn = self.conn.lock().await;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO roles (id, code, name, description, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    new.code,
                    new.name,
                    new.description,
                    Utc::now().timestamp(),
                ],
            )
            .map_err(storage)?
            > 0;
        let role = conn
            .query_row(
                "SELECT id, code, name, description, active, created_at
                 FROM roles WHERE code = ?1",
                params![new.code],
                row_to_role,
            )
            .map_err(storage)?;
        if inserted {
            debug!("created role {}", role.code);
        }
        Ok((role, inserted))
    }

    async fn list_active_permissions(&self) -> Result<Vec<Permission>, WardenError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, code, name, localized_name, description, category, active, created_at
                 FROM permissions WHERE active = 1 ORDER BY code",
            )
            .map_err(storage)?;
        let rows = stmt
            .query_map([], row_to_permission)
            .map_err(storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage)?;
        Ok(rows)
    }

    async fn list_active_roles(&self) -> Result<Vec<Role>, WardenError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, code, name, description, active, created_at
                 FROM roles WHERE active = 1 ORDER BY code",
            )
            .map_err(storage)?;
        let rows = stmt
            .query_map([], row_to_role)
            .map_err(storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage)?;
        Ok(rows)
    }

    async fn find_permission(&self, code: &str) -> Result<Option<Permission>, WardenError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, code, name, localized_name, description, category, active, created_at
             FROM permissions WHERE code = ?1",
            params![code],
            row_to_permission,
        )
        .optional()
        .map_err(storage)
    }

    async fn find_role(&self, code: &str) -> Result<Option<Role>, WardenError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, code, name, description, active, created_at
             FROM roles WHERE code = ?1",
            params![code],
            row_to_role,
        )
        .optional()
        .map_err(storage)
    }

    async fn deactivate_permission(&self, code: &str) -> Result<(), WardenError> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute("UPDATE permissions SET active = 0 WHERE code = ?1", params![code])
            .map_err(storage)?;
        if changed == 0 {
            return Err(WardenError::not_found(EntityKind::Permission, code));
        }
        info!("deactivated permission {}", code);
        Ok(())
    }

    async fn deactivate_role(&self, code: &str) -> Result<(), WardenError> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute("UPDATE roles SET active = 0 WHERE code = ?1", params![code])
            .map_err(storage)?;
        if changed == 0 {
            return Err(WardenError::not_found(EntityKind::Role, code));
        }
        info!("deactivated role {}", code);
        Ok(())
    }

    async fn set_grant(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
        state: GrantState,
    ) -> Result<bool, WardenError> {
        let conn = self.conn.lock().await;
        let existing: Option<i64> = conn
            .query_row(
                "SELECT granted FROM grants WHERE role_id = ?1 AND permission_id = ?2",
                params![role_id.to_string(), permission_id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?;
        conn.execute(
            "INSERT INTO grants (role_id, permission_id, granted, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (role_id, permission_id)
             DO UPDATE SET granted = excluded.granted, updated_at = excluded.updated_at",
            params![
                role_id.to_string(),
                permission_id.to_string(),
                matches!(state, GrantState::Granted) as i64,
                Utc::now().timestamp(),
            ],
        )
        .map_err(storage)?;
        Ok(existing.is_none())
    }

    async fn grant_decision(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<GrantDecision, WardenError> {
        let conn = self.conn.lock().await;
        let granted: Option<i64> = conn
            .query_row(
                "SELECT granted FROM grants WHERE role_id = ?1 AND permission_id = ?2",
                params![role_id.to_string(), permission_id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?;
        Ok(match granted {
            Some(v) if v != 0 => GrantDecision::Granted,
            Some(_) => GrantDecision::Revoked,
            None => GrantDecision::Absent,
        })
    }

    async fn granted_codes(&self, role_id: Uuid) -> Result<Vec<String>, WardenError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT p.code FROM grants g
                 JOIN permissions p ON p.id = g.permission_id
                 WHERE g.role_id = ?1 AND g.granted = 1 AND p.active = 1
                 ORDER BY p.code",
            )
            .map_err(storage)?;
        let codes = stmt
            .query_map(params![role_id.to_string()], |row| row.get(0))
            .map_err(storage)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(storage)?;
        Ok(codes)
    }

    async fn granted_names_by_category(
        &self,
        role_id: Uuid,
    ) -> Result<BTreeMap<String, Vec<String>>, WardenError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT p.category, p.name FROM grants g
                 JOIN permissions p ON p.id = g.permission_id
                 WHERE g.role_id = ?1 AND g.granted = 1 AND p.active = 1
                 ORDER BY p.category, p.name",
            )
            .map_err(storage)?;
        let pairs = stmt
            .query_map(params![role_id.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage)?;

        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (category, name) in pairs {
            grouped.entry(category).or_default().push(name);
        }
        Ok(grouped)
    }

    async fn revoke_all_grants(&self) -> Result<u64, WardenError> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE grants SET granted = 0, updated_at = ?1 WHERE granted = 1",
                params![Utc::now().timestamp()],
            )
            .map_err(storage)?;
        Ok(changed as u64)
    }

    async fn counts(&self) -> Result<StoreCounts, WardenError> {
        let conn = self.conn.lock().await;
        let scalar = |sql: &str| -> Result<u64, WardenError> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|v| v as u64)
                .map_err(storage)
        };
        Ok(StoreCounts {
            permissions: scalar("SELECT COUNT(*) FROM permissions")?,
            roles: scalar("SELECT COUNT(*) FROM roles")?,
            grant_rows: scalar("SELECT COUNT(*) FROM grants")?,
            granted: scalar("SELECT COUNT(*) FROM grants WHERE granted = 1")?,
        })
    }

    async fn grant_matrix(&self) -> Result<Vec<(String, String, bool)>, WardenError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT p.code, r.code, g.granted FROM grants g
                 JOIN permissions p ON p.id = g.permission_id
                 JOIN roles r ON r.id = g.role_id
                 WHERE p.active = 1 AND r.active = 1",
            )
            .map_err(storage)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)? != 0,
                ))
            })
            .map_err(storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage)?;
        Ok(rows)
    }

    async fn read_setting(&self, key: &str) -> Result<Option<String>, WardenError> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(storage)
    }

    async fn write_setting(&self, key: &str, value: &str) -> Result<(), WardenError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(storage)?;
        Ok(())
    }

    async fn delete_setting(&self, key: &str) -> Result<(), WardenError> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM settings WHERE key = ?1", params![key])
            .map_err(storage)?;
        Ok(())
    }
}

fn storage(e: rusqlite::Error) -> WardenError {
    WardenError::Storage(e.to_string())
}

// ---------------------------------------------------------------------------
// Row deserialization helpers
// ---------------------------------------------------------------------------

fn row_to_permission(row: &rusqlite::Row) -> rusqlite::Result<Permission> {
    let id_str: String = row.get(0)?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?;
    let active: i64 = row.get(6)?;
    Ok(Permission {
        id,
        code: row.get(1)?,
        name: row.get(2)?,
        localized_name: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        state: if active != 0 { CatalogState::Active } else { CatalogState::Inactive },
        created_at: row.get(7)?,
    })
}

fn row_to_role(row: &rusqlite::Row) -> rusqlite::Result<Role> {
    let id_str: String = row.get(0)?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?;
    let active: i64 = row.get(4)?;
    Ok(Role {
        id,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        state: if active != 0 { CatalogState::Active } else { CatalogState::Inactive },
        created_at: row.get(5)?,
    })
}
