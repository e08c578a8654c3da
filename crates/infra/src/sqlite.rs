//! SQLite-backed admin store for single-node deployments.
//!
//! One file holds the whole authorization schema: user rows, the permission
//! graph, and the menu tree. Ids are stored as UUID text, timestamps as
//! RFC 3339 text.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};
use wardgate_core::{MenuId, PermissionId, RoleId, StoreError, StoreResult, UserId};

use wardgate_auth::hasher::PasswordHasher;
use wardgate_auth::identity::Identity;
use wardgate_auth::menu::MenuEntry;
use wardgate_auth::permission::Permission;
use wardgate_auth::store::{MenuStore, PermissionStore, UserStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS admin_users (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    login_fail_count INTEGER NOT NULL DEFAULT 0,
    access_token TEXT,
    real_name TEXT NOT NULL,
    avatar TEXT,
    is_super INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_admin_users_token ON admin_users(access_token);

CREATE TABLE IF NOT EXISTS admin_permissions (
    id TEXT PRIMARY KEY,
    http_path TEXT NOT NULL,
    http_method TEXT NOT NULL,
    slug TEXT
);

CREATE TABLE IF NOT EXISTS admin_user_permissions (
    user_id TEXT NOT NULL,
    permission_id TEXT NOT NULL,
    PRIMARY KEY (user_id, permission_id)
);

CREATE TABLE IF NOT EXISTS admin_role_users (
    role_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    PRIMARY KEY (role_id, user_id)
);

CREATE TABLE IF NOT EXISTS admin_role_permissions (
    role_id TEXT NOT NULL,
    permission_id TEXT NOT NULL,
    PRIMARY KEY (role_id, permission_id)
);

CREATE TABLE IF NOT EXISTS admin_menus (
    id TEXT PRIMARY KEY,
    parent_id TEXT,
    title TEXT NOT NULL,
    path TEXT,
    icon TEXT,
    weight INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS admin_role_menus (
    role_id TEXT NOT NULL,
    menu_id TEXT NOT NULL,
    PRIMARY KEY (role_id, menu_id)
);
";

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::query(e.to_string())
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::decode(format!("bad timestamp {raw:?}: {e}")))
}

fn in_clause(len: usize) -> String {
    vec!["?"; len].join(", ")
}

/// All three store traits over one SQLite connection.
///
/// A single connection behind a mutex serializes writes, so each `persist`
/// is one atomic UPDATE.
pub struct SqliteAdminStore {
    conn: Mutex<Connection>,
}

impl SqliteAdminStore {
    /// Open (creating if absent) the database at `path` and ensure the
    /// schema exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|e| StoreError::unavailable(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Private scratch database. Contents vanish with the store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::unavailable(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::unavailable("connection lock poisoned"))
    }

    /// Ensure a super-admin row named `username` exists, creating it with
    /// the given credentials when missing. Returns the row's id either way.
    pub fn bootstrap_admin(
        &self,
        hasher: &dyn PasswordHasher,
        username: &str,
        password: &str,
    ) -> StoreResult<UserId> {
        if let Some(existing) = self.find_by_username(username)? {
            return Ok(existing.id);
        }

        let admin = Identity::provision(username, hasher.hash(password)).with_super(true);
        self.seed_user(&admin)?;
        tracing::info!("bootstrapped super-admin account: {}", username);
        Ok(admin.id)
    }

    /// Insert a full user row. `persist` only updates existing rows.
    pub fn seed_user(&self, identity: &Identity) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO admin_users (id, username, password_hash, login_fail_count,
                                      access_token, real_name, avatar, is_super,
                                      created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                identity.id.to_string(),
                identity.username,
                identity.password_hash,
                identity.login_fail_count,
                identity.access_token,
                identity.real_name,
                identity.avatar,
                identity.is_super,
                identity.created_at.to_rfc3339(),
                identity.updated_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn define_permission(&self, permission: &Permission) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO admin_permissions (id, http_path, http_method, slug)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                permission.id.to_string(),
                permission.http_path,
                permission.http_method,
                permission.slug,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn grant_direct(&self, user: UserId, permission: PermissionId) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO admin_user_permissions (user_id, permission_id)
             VALUES (?1, ?2)",
            params![user.to_string(), permission.to_string()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn assign_role(&self, user: UserId, role: RoleId) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO admin_role_users (role_id, user_id) VALUES (?1, ?2)",
            params![role.to_string(), user.to_string()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn grant_role(&self, role: RoleId, permission: PermissionId) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO admin_role_permissions (role_id, permission_id)
             VALUES (?1, ?2)",
            params![role.to_string(), permission.to_string()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn define_menu(&self, entry: &MenuEntry) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO admin_menus (id, parent_id, title, path, icon, weight)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id.to_string(),
                entry.parent_id.map(|id| id.to_string()),
                entry.title,
                entry.path,
                entry.icon,
                entry.weight,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub fn link_menu(&self, role: RoleId, menu: MenuId) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO admin_role_menus (role_id, menu_id) VALUES (?1, ?2)",
            params![role.to_string(), menu.to_string()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn find_user_where(&self, clause: &str, value: &str) -> StoreResult<Option<Identity>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, username, password_hash, login_fail_count, access_token,
                    real_name, avatar, is_super, created_at, updated_at
             FROM admin_users WHERE {clause}"
        );
        let fetched = conn.query_row(&sql, params![value], UserRow::from_row);
        match fetched {
            Ok(row) => Ok(Some(row.into_identity()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }
}

struct UserRow {
    id: String,
    username: String,
    password_hash: String,
    login_fail_count: u32,
    access_token: Option<String>,
    real_name: String,
    avatar: Option<String>,
    is_super: bool,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            login_fail_count: row.get(3)?,
            access_token: row.get(4)?,
            real_name: row.get(5)?,
            avatar: row.get(6)?,
            is_super: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_identity(self) -> StoreResult<Identity> {
        Ok(Identity {
            id: UserId::from_str(&self.id)?,
            username: self.username,
            password_hash: self.password_hash,
            login_fail_count: self.login_fail_count,
            access_token: self.access_token,
            real_name: self.real_name,
            avatar: self.avatar,
            is_super: self.is_super,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

impl UserStore for SqliteAdminStore {
    fn find_by_username(&self, username: &str) -> StoreResult<Option<Identity>> {
        self.find_user_where("username = ?1", username)
    }

    fn find_by_token(&self, token: &str) -> StoreResult<Option<Identity>> {
        // NULL tokens never compare equal; empty ones are excluded here.
        self.find_user_where("access_token = ?1 AND access_token <> ''", token)
    }

    fn persist(&self, identity: &Identity) -> StoreResult<()> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE admin_users
                 SET username = ?2, password_hash = ?3, login_fail_count = ?4,
                     access_token = ?5, real_name = ?6, avatar = ?7, is_super = ?8,
                     updated_at = ?9
                 WHERE id = ?1",
                params![
                    identity.id.to_string(),
                    identity.username,
                    identity.password_hash,
                    identity.login_fail_count,
                    identity.access_token,
                    identity.real_name,
                    identity.avatar,
                    identity.is_super,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(db_err)?;

        if updated == 0 {
            return Err(StoreError::query(format!(
                "no admin_users row for {}",
                identity.id
            )));
        }
        Ok(())
    }
}

impl PermissionStore for SqliteAdminStore {
    fn direct_permission_ids(&self, user: UserId) -> StoreResult<Vec<PermissionId>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT permission_id FROM admin_user_permissions WHERE user_id = ?1")
            .map_err(db_err)?;
        let raw = stmt
            .query_map(params![user.to_string()], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        raw.iter().map(|s| PermissionId::from_str(s)).collect()
    }

    fn role_ids(&self, user: UserId) -> StoreResult<Vec<RoleId>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT role_id FROM admin_role_users WHERE user_id = ?1")
            .map_err(db_err)?;
        let raw = stmt
            .query_map(params![user.to_string()], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        raw.iter().map(|s| RoleId::from_str(s)).collect()
    }

    fn role_permission_ids(&self, roles: &[RoleId]) -> StoreResult<Vec<PermissionId>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT DISTINCT permission_id FROM admin_role_permissions WHERE role_id IN ({})",
            in_clause(roles.len())
        );
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let raw = stmt
            .query_map(params_from_iter(roles.iter().map(|r| r.to_string())), |row| {
                row.get::<_, String>(0)
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        raw.iter().map(|s| PermissionId::from_str(s)).collect()
    }

    fn permissions_by_ids(&self, ids: &[PermissionId]) -> StoreResult<Vec<Permission>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, http_path, http_method, slug FROM admin_permissions WHERE id IN ({})",
            in_clause(ids.len())
        );
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let raw = stmt
            .query_map(params_from_iter(ids.iter().map(|id| id.to_string())), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        raw.into_iter()
            .map(|(id, http_path, http_method, slug)| {
                Ok(Permission {
                    id: PermissionId::from_str(&id)?,
                    http_path,
                    http_method,
                    slug,
                })
            })
            .collect()
    }
}

impl MenuStore for SqliteAdminStore {
    fn role_menu_ids(&self, roles: &[RoleId]) -> StoreResult<Vec<MenuId>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT DISTINCT menu_id FROM admin_role_menus WHERE role_id IN ({})",
            in_clause(roles.len())
        );
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let raw = stmt
            .query_map(params_from_iter(roles.iter().map(|r| r.to_string())), |row| {
                row.get::<_, String>(0)
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        raw.iter().map(|s| MenuId::from_str(s)).collect()
    }

    fn menus_by_ids(&self, ids: &[MenuId]) -> StoreResult<Vec<MenuEntry>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, parent_id, title, path, icon, weight FROM admin_menus WHERE id IN ({})",
            in_clause(ids.len())
        );
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let raw = stmt
            .query_map(params_from_iter(ids.iter().map(|id| id.to_string())), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i32>(5)?,
                ))
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        raw.into_iter()
            .map(|(id, parent_id, title, path, icon, weight)| {
                Ok(MenuEntry {
                    id: MenuId::from_str(&id)?,
                    parent_id: parent_id.as_deref().map(MenuId::from_str).transpose()?,
                    title,
                    path,
                    icon,
                    weight,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::NamedTempFile;
    use wardgate_auth::authenticator::Authenticator;
    use wardgate_auth::config::AuthConfig;
    use wardgate_auth::hasher::SaltedDigest;

    use super::*;

    fn open_temp() -> (SqliteAdminStore, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteAdminStore::open(file.path()).unwrap();
        (store, file)
    }

    #[test]
    fn bootstrap_admin_is_idempotent() {
        let (store, _file) = open_temp();
        let hasher = SaltedDigest::default();

        let first = store.bootstrap_admin(&hasher, "admin", "s3cret").unwrap();
        let second = store.bootstrap_admin(&hasher, "admin", "different").unwrap();
        assert_eq!(first, second);

        let row = store.find_by_username("admin").unwrap().unwrap();
        assert!(row.is_super);
        assert_eq!(row.password_hash, hasher.hash("s3cret"));
    }

    #[test]
    fn seeded_rows_round_trip_exactly() {
        let (store, _file) = open_temp();
        let mut alice = Identity::provision("alice", "digest")
            .with_real_name("Alice Ji")
            .with_avatar("/static/alice.png");
        alice.login_fail_count = 4;
        alice.access_token = Some("tok-1".to_string());

        store.seed_user(&alice).unwrap();
        let fetched = store.find_by_username("alice").unwrap().unwrap();
        assert_eq!(fetched, alice);
    }

    #[test]
    fn missing_rows_resolve_to_none() {
        let (store, _file) = open_temp();
        assert!(store.find_by_username("ghost").unwrap().is_none());
        assert!(store.find_by_token("tok-1").unwrap().is_none());
    }

    #[test]
    fn persist_updates_in_place() {
        let (store, _file) = open_temp();
        let alice = Identity::provision("alice", "digest");
        let seeded_at = alice.updated_at;
        store.seed_user(&alice).unwrap();

        let mut changed = alice;
        changed.access_token = Some("tok-9".to_string());
        changed.login_fail_count = 2;
        store.persist(&changed).unwrap();

        let fetched = store.find_by_token("tok-9").unwrap().unwrap();
        assert_eq!(fetched.login_fail_count, 2);
        assert!(fetched.updated_at >= seeded_at);
    }

    #[test]
    fn persist_without_a_row_is_a_query_error() {
        let (store, _file) = open_temp();
        let ghost = Identity::provision("ghost", "digest");
        let err = store.persist(&ghost).unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }

    #[test]
    fn empty_tokens_never_match() {
        let (store, _file) = open_temp();
        let mut row = Identity::provision("alice", "digest");
        row.access_token = Some(String::new());
        store.seed_user(&row).unwrap();

        assert!(store.find_by_token("").unwrap().is_none());
    }

    #[test]
    fn permission_graph_queries_resolve() {
        let (store, _file) = open_temp();
        let user = UserId::new();
        let editors = RoleId::new();
        let auditors = RoleId::new();

        let direct = Permission::route("/admin/profile", "GET");
        let shared = Permission::route("/admin/reports", "GET").with_slug("reports");
        store.define_permission(&direct).unwrap();
        store.define_permission(&shared).unwrap();

        store.grant_direct(user, direct.id).unwrap();
        store.assign_role(user, editors).unwrap();
        store.assign_role(user, auditors).unwrap();
        store.grant_role(editors, shared.id).unwrap();
        store.grant_role(auditors, shared.id).unwrap();

        assert_eq!(store.direct_permission_ids(user).unwrap(), vec![direct.id]);
        assert_eq!(store.role_ids(user).unwrap().len(), 2);

        // Shared grant comes back once even though two roles carry it.
        let via_roles = store.role_permission_ids(&[editors, auditors]).unwrap();
        assert_eq!(via_roles, vec![shared.id]);

        let records = store.permissions_by_ids(&[direct.id, shared.id]).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.contains(&shared));
    }

    #[test]
    fn menu_queries_resolve() {
        let (store, _file) = open_temp();
        let role = RoleId::new();

        let root = MenuEntry::new("System").with_weight(10);
        let child = MenuEntry::new("Users")
            .with_parent(root.id)
            .with_path("/admin/users")
            .with_icon("user")
            .with_weight(5);
        store.define_menu(&root).unwrap();
        store.define_menu(&child).unwrap();
        store.link_menu(role, root.id).unwrap();
        store.link_menu(role, child.id).unwrap();

        let ids = store.role_menu_ids(&[role]).unwrap();
        assert_eq!(ids.len(), 2);

        let entries = store.menus_by_ids(&ids).unwrap();
        assert_eq!(entries.len(), 2);
        let fetched_child = entries.iter().find(|e| e.title == "Users").unwrap();
        assert_eq!(fetched_child, &child);
    }

    #[test]
    fn login_works_end_to_end_over_sqlite() {
        let store = Arc::new(SqliteAdminStore::open_in_memory().unwrap());
        let hasher = SaltedDigest::default();
        store.bootstrap_admin(&hasher, "admin", "s3cret").unwrap();

        let auth = Authenticator::new(store.clone(), AuthConfig::default());
        let token = auth.login("admin", "s3cret").unwrap();

        let resolved = auth.resolve_token(&token).unwrap().unwrap();
        assert_eq!(resolved.username, "admin");
        assert!(resolved.is_super);
    }
}
