//! Role-derived admin navigation.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use wardgate_core::MenuId;

use crate::error::AuthResult;
use crate::session::AuthSession;
use crate::store::{MenuStore, PermissionStore};

/// One admin navigation entry. Read-only reference data linked to roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: MenuId,
    pub parent_id: Option<MenuId>,
    pub title: String,
    /// Route the entry links to; section headers carry none.
    pub path: Option<String>,
    pub icon: Option<String>,
    /// Display weight; heavier entries sort first.
    pub weight: i32,
}

impl MenuEntry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: MenuId::new(),
            parent_id: None,
            title: title.into(),
            path: None,
            icon: None,
            weight: 0,
        }
    }

    pub fn with_parent(mut self, parent: MenuId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }
}

/// Computes the navigation an identity sees: every menu entry linked to any
/// of its roles, heaviest first.
pub struct MenuResolver {
    perms: Arc<dyn PermissionStore>,
    menus: Arc<dyn MenuStore>,
}

impl MenuResolver {
    pub fn new(perms: Arc<dyn PermissionStore>, menus: Arc<dyn MenuStore>) -> Self {
        Self { perms, menus }
    }

    /// Menu for the bound identity. Guests and role-less identities get an
    /// empty menu; entries arrive sorted by weight descending, then id
    /// descending (newest first among equals).
    pub fn admin_menu(&self, session: &AuthSession) -> AuthResult<Vec<MenuEntry>> {
        let Some(identity) = session.identity() else {
            return Ok(Vec::new());
        };

        let roles = self.perms.role_ids(identity.id)?;
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let menu_ids = self.menus.role_menu_ids(&roles)?;
        if menu_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Roles may share menu entries; fetch each id once.
        let menu_ids: Vec<MenuId> = menu_ids
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let mut entries = self.menus.menus_by_ids(&menu_ids)?;
        entries.sort_by(|a, b| {
            b.weight
                .cmp(&a.weight)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::RwLock;

    use wardgate_core::{PermissionId, RoleId, StoreResult, UserId};

    use super::*;
    use crate::identity::Identity;
    use crate::permission::Permission;

    #[derive(Default)]
    struct Fixture {
        memberships: RwLock<HashMap<UserId, Vec<RoleId>>>,
        role_menus: RwLock<HashMap<RoleId, Vec<MenuId>>>,
        entries: RwLock<HashMap<MenuId, MenuEntry>>,
    }

    impl Fixture {
        fn assign_role(&self, user: UserId, role: RoleId) {
            self.memberships
                .write()
                .unwrap()
                .entry(user)
                .or_default()
                .push(role);
        }

        fn link_menu(&self, role: RoleId, entry: &MenuEntry) {
            self.entries
                .write()
                .unwrap()
                .insert(entry.id, entry.clone());
            self.role_menus
                .write()
                .unwrap()
                .entry(role)
                .or_default()
                .push(entry.id);
        }
    }

    impl PermissionStore for Fixture {
        fn direct_permission_ids(&self, _user: UserId) -> StoreResult<Vec<PermissionId>> {
            Ok(Vec::new())
        }

        fn role_ids(&self, user: UserId) -> StoreResult<Vec<RoleId>> {
            Ok(self
                .memberships
                .read()
                .unwrap()
                .get(&user)
                .cloned()
                .unwrap_or_default())
        }

        fn role_permission_ids(&self, _roles: &[RoleId]) -> StoreResult<Vec<PermissionId>> {
            Ok(Vec::new())
        }

        fn permissions_by_ids(&self, _ids: &[PermissionId]) -> StoreResult<Vec<Permission>> {
            Ok(Vec::new())
        }
    }

    impl MenuStore for Fixture {
        fn role_menu_ids(&self, roles: &[RoleId]) -> StoreResult<Vec<MenuId>> {
            let links = self.role_menus.read().unwrap();
            Ok(roles
                .iter()
                .flat_map(|r| links.get(r).cloned().unwrap_or_default())
                .collect())
        }

        fn menus_by_ids(&self, ids: &[MenuId]) -> StoreResult<Vec<MenuEntry>> {
            let entries = self.entries.read().unwrap();
            Ok(ids.iter().filter_map(|id| entries.get(id).cloned()).collect())
        }
    }

    fn resolver(fixture: Arc<Fixture>) -> MenuResolver {
        MenuResolver::new(fixture.clone(), fixture)
    }

    #[test]
    fn guests_get_an_empty_menu() {
        let menu = resolver(Arc::new(Fixture::default()))
            .admin_menu(&AuthSession::anonymous())
            .unwrap();
        assert!(menu.is_empty());
    }

    #[test]
    fn identities_without_roles_get_an_empty_menu() {
        let fixture = Arc::new(Fixture::default());
        let session = AuthSession::for_identity(Identity::provision("alice", "d"));
        assert!(resolver(fixture).admin_menu(&session).unwrap().is_empty());
    }

    #[test]
    fn roles_without_menus_get_an_empty_menu() {
        let fixture = Arc::new(Fixture::default());
        let identity = Identity::provision("alice", "d");
        fixture.assign_role(identity.id, RoleId::new());

        let session = AuthSession::for_identity(identity);
        assert!(resolver(fixture.clone()).admin_menu(&session).unwrap().is_empty());
    }

    #[test]
    fn entries_sort_by_weight_then_recency() {
        let fixture = Arc::new(Fixture::default());
        let identity = Identity::provision("alice", "d");
        let role = RoleId::new();
        fixture.assign_role(identity.id, role);

        let dashboard = MenuEntry::new("Dashboard").with_weight(5);
        let users = MenuEntry::new("Users").with_weight(5);
        let trash = MenuEntry::new("Trash").with_weight(1);
        fixture.link_menu(role, &dashboard);
        fixture.link_menu(role, &users);
        fixture.link_menu(role, &trash);

        let session = AuthSession::for_identity(identity);
        let menu = resolver(fixture.clone()).admin_menu(&session).unwrap();

        let titles: Vec<&str> = menu.iter().map(|m| m.title.as_str()).collect();
        // UUIDv7 ids are time-ordered, so "Users" (created after "Dashboard")
        // wins the weight tie.
        assert_eq!(titles, vec!["Users", "Dashboard", "Trash"]);
    }

    #[test]
    fn shared_menus_across_roles_appear_once() {
        let fixture = Arc::new(Fixture::default());
        let identity = Identity::provision("alice", "d");
        let editors = RoleId::new();
        let auditors = RoleId::new();
        fixture.assign_role(identity.id, editors);
        fixture.assign_role(identity.id, auditors);

        let shared = MenuEntry::new("Reports").with_path("/reports");
        fixture.link_menu(editors, &shared);
        fixture.link_menu(auditors, &shared);

        let session = AuthSession::for_identity(identity);
        let menu = resolver(fixture.clone()).admin_menu(&session).unwrap();
        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].title, "Reports");
    }
}
