//! Shared permission-cache seam.

use std::sync::Arc;

use wardgate_core::{StoreResult, UserId};

use crate::permission::Permission;

/// Tag carried by every resolver write, so one invalidation can drop all
/// cached permission sets at once.
pub const PERMISSION_CACHE_TAG: &str = "wardgate.permissions";

/// Cache key for one identity's resolved set. Keys are always per-identity;
/// nothing in the resolver ever reads or writes a shared constant key.
pub fn permission_cache_key(user: UserId) -> String {
    format!("{PERMISSION_CACHE_TAG}.{user}")
}

/// Process-shared (or external) cache for resolved permission sets.
///
/// Optional collaborator: the resolver touches it only when
/// [`AuthConfig::cache_permissions`](crate::config::AuthConfig) is set.
/// During resolution it counts as a backing store, so its faults propagate
/// to the caller like any other store fault.
pub trait PermissionCache: Send + Sync {
    /// Records cached under the key, if any.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<Permission>>>;

    /// Store records under the key and remember the tag → key association.
    fn set_tagged(&self, tag: &str, key: &str, records: &[Permission]) -> StoreResult<()>;

    /// Drop one key. Unknown keys are a no-op.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Drop every key stored under the tag.
    fn remove_tag(&self, tag: &str) -> StoreResult<()>;
}

impl<C> PermissionCache for Arc<C>
where
    C: PermissionCache + ?Sized,
{
    fn get(&self, key: &str) -> StoreResult<Option<Vec<Permission>>> {
        (**self).get(key)
    }

    fn set_tagged(&self, tag: &str, key: &str, records: &[Permission]) -> StoreResult<()> {
        (**self).set_tagged(tag, key, records)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }

    fn remove_tag(&self, tag: &str) -> StoreResult<()> {
        (**self).remove_tag(tag)
    }
}
