//! In-memory adapters.
//!
//! Intended for tests and embedded setups. Not optimized for performance.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::Utc;
use wardgate_core::{MenuId, PermissionId, RoleId, StoreError, StoreResult, UserId};

use wardgate_auth::cache::PermissionCache;
use wardgate_auth::identity::Identity;
use wardgate_auth::menu::MenuEntry;
use wardgate_auth::permission::Permission;
use wardgate_auth::store::{MenuStore, PermissionStore, UserStore};

/// User rows in a `RwLock<HashMap>` keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    rows: RwLock<HashMap<UserId, Identity>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row as provisioning would, returning its id.
    pub fn seed(&self, identity: Identity) -> StoreResult<UserId> {
        let id = identity.id;
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::unavailable("user store lock poisoned"))?;
        rows.insert(id, identity);
        Ok(id)
    }

    pub fn get(&self, id: UserId) -> StoreResult<Option<Identity>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::unavailable("user store lock poisoned"))?;
        Ok(rows.get(&id).cloned())
    }
}

impl UserStore for InMemoryUserStore {
    fn find_by_username(&self, username: &str) -> StoreResult<Option<Identity>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::unavailable("user store lock poisoned"))?;
        Ok(rows.values().find(|row| row.username == username).cloned())
    }

    fn find_by_token(&self, token: &str) -> StoreResult<Option<Identity>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::unavailable("user store lock poisoned"))?;
        // A row without a token, or with an empty one, matches nothing.
        Ok(rows
            .values()
            .find(|row| {
                row.access_token
                    .as_deref()
                    .is_some_and(|stored| !stored.is_empty() && stored == token)
            })
            .cloned())
    }

    fn persist(&self, identity: &Identity) -> StoreResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::unavailable("user store lock poisoned"))?;
        let mut row = identity.clone();
        row.updated_at = Utc::now();
        rows.insert(row.id, row);
        Ok(())
    }
}

/// Permission graph: records plus the direct/role grant links.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    records: RwLock<HashMap<PermissionId, Permission>>,
    direct: RwLock<HashMap<UserId, Vec<PermissionId>>>,
    memberships: RwLock<HashMap<UserId, Vec<RoleId>>>,
    role_grants: RwLock<HashMap<RoleId, Vec<PermissionId>>>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a permission record, returning its id.
    pub fn define(&self, permission: Permission) -> StoreResult<PermissionId> {
        let id = permission.id;
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::unavailable("permission store lock poisoned"))?;
        records.insert(id, permission);
        Ok(id)
    }

    pub fn grant_direct(&self, user: UserId, permission: PermissionId) -> StoreResult<()> {
        let mut direct = self
            .direct
            .write()
            .map_err(|_| StoreError::unavailable("permission store lock poisoned"))?;
        direct.entry(user).or_default().push(permission);
        Ok(())
    }

    pub fn assign_role(&self, user: UserId, role: RoleId) -> StoreResult<()> {
        let mut memberships = self
            .memberships
            .write()
            .map_err(|_| StoreError::unavailable("permission store lock poisoned"))?;
        memberships.entry(user).or_default().push(role);
        Ok(())
    }

    pub fn grant_role(&self, role: RoleId, permission: PermissionId) -> StoreResult<()> {
        let mut grants = self
            .role_grants
            .write()
            .map_err(|_| StoreError::unavailable("permission store lock poisoned"))?;
        grants.entry(role).or_default().push(permission);
        Ok(())
    }
}

impl PermissionStore for InMemoryPermissionStore {
    fn direct_permission_ids(&self, user: UserId) -> StoreResult<Vec<PermissionId>> {
        let direct = self
            .direct
            .read()
            .map_err(|_| StoreError::unavailable("permission store lock poisoned"))?;
        Ok(direct.get(&user).cloned().unwrap_or_default())
    }

    fn role_ids(&self, user: UserId) -> StoreResult<Vec<RoleId>> {
        let memberships = self
            .memberships
            .read()
            .map_err(|_| StoreError::unavailable("permission store lock poisoned"))?;
        Ok(memberships.get(&user).cloned().unwrap_or_default())
    }

    fn role_permission_ids(&self, roles: &[RoleId]) -> StoreResult<Vec<PermissionId>> {
        let grants = self
            .role_grants
            .read()
            .map_err(|_| StoreError::unavailable("permission store lock poisoned"))?;
        Ok(roles
            .iter()
            .flat_map(|role| grants.get(role).cloned().unwrap_or_default())
            .collect())
    }

    fn permissions_by_ids(&self, ids: &[PermissionId]) -> StoreResult<Vec<Permission>> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::unavailable("permission store lock poisoned"))?;
        // Dangling grant links are skipped rather than failing the fetch.
        Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
    }
}

/// Menu entries plus the role links that expose them.
#[derive(Debug, Default)]
pub struct InMemoryMenuStore {
    entries: RwLock<HashMap<MenuId, MenuEntry>>,
    role_links: RwLock<HashMap<RoleId, Vec<MenuId>>>,
}

impl InMemoryMenuStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&self, entry: MenuEntry) -> StoreResult<MenuId> {
        let id = entry.id;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::unavailable("menu store lock poisoned"))?;
        entries.insert(id, entry);
        Ok(id)
    }

    pub fn link_role(&self, role: RoleId, menu: MenuId) -> StoreResult<()> {
        let mut links = self
            .role_links
            .write()
            .map_err(|_| StoreError::unavailable("menu store lock poisoned"))?;
        links.entry(role).or_default().push(menu);
        Ok(())
    }
}

impl MenuStore for InMemoryMenuStore {
    fn role_menu_ids(&self, roles: &[RoleId]) -> StoreResult<Vec<MenuId>> {
        let links = self
            .role_links
            .read()
            .map_err(|_| StoreError::unavailable("menu store lock poisoned"))?;
        Ok(roles
            .iter()
            .flat_map(|role| links.get(role).cloned().unwrap_or_default())
            .collect())
    }

    fn menus_by_ids(&self, ids: &[MenuId]) -> StoreResult<Vec<MenuEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::unavailable("menu store lock poisoned"))?;
        Ok(ids.iter().filter_map(|id| entries.get(id).cloned()).collect())
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    /// key → serialized permission list.
    entries: HashMap<String, String>,
    /// tag → keys written under it.
    tags: HashMap<String, HashSet<String>>,
}

/// Tagged cache holding JSON payloads, the way an external cache would.
///
/// Entries are serialized on write and parsed on read; a payload that no
/// longer round-trips surfaces as a decode error, as it would from Redis.
#[derive(Debug, Default)]
pub struct InMemoryTaggedCache {
    inner: RwLock<CacheInner>,
}

impl InMemoryTaggedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live cache entries.
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PermissionCache for InMemoryTaggedCache {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<Permission>>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::unavailable("cache lock poisoned"))?;
        match inner.entries.get(key) {
            Some(payload) => {
                let records = serde_json::from_str(payload)
                    .map_err(|e| StoreError::decode(format!("cache entry {key}: {e}")))?;
                Ok(Some(records))
            }
            None => Ok(None),
        }
    }

    fn set_tagged(&self, tag: &str, key: &str, records: &[Permission]) -> StoreResult<()> {
        let payload = serde_json::to_string(records)
            .map_err(|e| StoreError::decode(format!("cache entry {key}: {e}")))?;
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::unavailable("cache lock poisoned"))?;
        inner.entries.insert(key.to_string(), payload);
        inner
            .tags
            .entry(tag.to_string())
            .or_default()
            .insert(key.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::unavailable("cache lock poisoned"))?;
        inner.entries.remove(key);
        Ok(())
    }

    fn remove_tag(&self, tag: &str) -> StoreResult<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::unavailable("cache lock poisoned"))?;
        if let Some(keys) = inner.tags.remove(tag) {
            for key in keys {
                inner.entries.remove(&key);
            }
        }
        Ok(())
    }
}
