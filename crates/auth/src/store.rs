//! Store seams the authorization core consumes.
//!
//! The core is storage-agnostic: anything that answers these queries can
//! back it. `wardgate-infra` ships in-memory and SQLite implementations.
//! All calls are blocking; the core runs inside one request context and
//! must see writes committed before the call returns.

use std::sync::Arc;

use wardgate_core::{MenuId, PermissionId, RoleId, StoreResult, UserId};

use crate::identity::Identity;
use crate::menu::MenuEntry;
use crate::permission::Permission;

/// Administrative user rows.
pub trait UserStore: Send + Sync {
    /// Exact, case-sensitive username lookup.
    fn find_by_username(&self, username: &str) -> StoreResult<Option<Identity>>;

    /// Exact token lookup. Implementations must never match rows whose
    /// stored token is absent, whatever the probe value.
    fn find_by_token(&self, token: &str) -> StoreResult<Option<Identity>>;

    /// Write the row back. The write must be committed when this returns:
    /// failure counts and tokens are security-relevant.
    fn persist(&self, identity: &Identity) -> StoreResult<()>;
}

impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    fn find_by_username(&self, username: &str) -> StoreResult<Option<Identity>> {
        (**self).find_by_username(username)
    }

    fn find_by_token(&self, token: &str) -> StoreResult<Option<Identity>> {
        (**self).find_by_token(token)
    }

    fn persist(&self, identity: &Identity) -> StoreResult<()> {
        (**self).persist(identity)
    }
}

/// Read side of the role/permission graph.
pub trait PermissionStore: Send + Sync {
    /// Permission ids assigned straight to the user.
    fn direct_permission_ids(&self, user: UserId) -> StoreResult<Vec<PermissionId>>;

    /// Roles the user belongs to.
    fn role_ids(&self, user: UserId) -> StoreResult<Vec<RoleId>>;

    /// Permission ids granted through any of the given roles.
    fn role_permission_ids(&self, roles: &[RoleId]) -> StoreResult<Vec<PermissionId>>;

    /// Full records for an id set. Unknown ids are skipped, not errors.
    fn permissions_by_ids(&self, ids: &[PermissionId]) -> StoreResult<Vec<Permission>>;
}

impl<S> PermissionStore for Arc<S>
where
    S: PermissionStore + ?Sized,
{
    fn direct_permission_ids(&self, user: UserId) -> StoreResult<Vec<PermissionId>> {
        (**self).direct_permission_ids(user)
    }

    fn role_ids(&self, user: UserId) -> StoreResult<Vec<RoleId>> {
        (**self).role_ids(user)
    }

    fn role_permission_ids(&self, roles: &[RoleId]) -> StoreResult<Vec<PermissionId>> {
        (**self).role_permission_ids(roles)
    }

    fn permissions_by_ids(&self, ids: &[PermissionId]) -> StoreResult<Vec<Permission>> {
        (**self).permissions_by_ids(ids)
    }
}

/// Navigation menu rows linked to roles.
pub trait MenuStore: Send + Sync {
    /// Menu ids granted through any of the given roles.
    fn role_menu_ids(&self, roles: &[RoleId]) -> StoreResult<Vec<MenuId>>;

    /// Full records for an id set. Unknown ids are skipped, not errors.
    fn menus_by_ids(&self, ids: &[MenuId]) -> StoreResult<Vec<MenuEntry>>;
}

impl<S> MenuStore for Arc<S>
where
    S: MenuStore + ?Sized,
{
    fn role_menu_ids(&self, roles: &[RoleId]) -> StoreResult<Vec<MenuId>> {
        (**self).role_menu_ids(roles)
    }

    fn menus_by_ids(&self, ids: &[MenuId]) -> StoreResult<Vec<MenuEntry>> {
        (**self).menus_by_ids(ids)
    }
}
