//! Set-union permission resolution and point queries.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use wardgate_core::{PermissionId, UserId};

use crate::cache::{permission_cache_key, PermissionCache, PERMISSION_CACHE_TAG};
use crate::config::AuthConfig;
use crate::error::AuthResult;
use crate::hasher::hex_sha256;
use crate::identity::Identity;
use crate::permission::PermissionSet;
use crate::session::AuthSession;
use crate::store::PermissionStore;

/// Answers "may this identity do X" with one warm lookup, backed by a
/// one-time union of direct and role-granted permissions.
///
/// Resolution order: session memo, then the shared cache (when enabled),
/// then the store. The memo lives in [`AuthSession`]; the resolver itself is
/// shared across requests.
pub struct PermissionResolver {
    store: Arc<dyn PermissionStore>,
    cache: Option<Arc<dyn PermissionCache>>,
    config: AuthConfig,
    inflight: InflightLocks,
}

impl PermissionResolver {
    /// Resolver without a shared cache; every session warms up from the
    /// store once.
    pub fn new(store: Arc<dyn PermissionStore>, config: AuthConfig) -> Self {
        Self {
            store,
            cache: None,
            config,
            inflight: InflightLocks::default(),
        }
    }

    /// Resolver with a shared cache. The cache is probed and written only
    /// when [`AuthConfig::cache_permissions`] is set.
    pub fn with_cache(
        store: Arc<dyn PermissionStore>,
        cache: Arc<dyn PermissionCache>,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            cache: Some(cache),
            config,
            inflight: InflightLocks::default(),
        }
    }

    fn shared_cache(&self) -> Option<&Arc<dyn PermissionCache>> {
        if self.config.cache_permissions {
            self.cache.as_ref()
        } else {
            None
        }
    }

    /// Resolve the session's permission set, computing it at most once per
    /// session.
    ///
    /// Guest sessions memoize an empty set without touching any store. An
    /// empty union is memoized too (distinct from "not yet computed") but
    /// never written to the shared cache.
    pub fn resolve_all<'s>(&self, session: &'s mut AuthSession) -> AuthResult<&'s PermissionSet> {
        let set = match session.take_memo() {
            Some(memo) => memo,
            None => self.resolve_for(session.identity())?,
        };
        Ok(session.memoize(set))
    }

    /// Route query: exact `path` + `method` match first, wildcard prefix
    /// rules second. Empty set answers `false`, never an error.
    pub fn check(&self, session: &mut AuthSession, path: &str, method: &str) -> AuthResult<bool> {
        let anchored = self.config.anchored_wildcards;
        let set = self.resolve_all(session)?;
        Ok(set.allows_route(path, method, anchored))
    }

    /// Named-capability query over stored slugs and the session's ad-hoc
    /// grants. Empty set answers `false`, never an error.
    pub fn check_slug(&self, session: &mut AuthSession, slug: &str) -> AuthResult<bool> {
        let stored = self.resolve_all(session)?.allows_slug(slug);
        Ok(stored || session.has_grant(slug))
    }

    /// Session-scoped grant for a capability computed outside the store.
    ///
    /// Visible to [`check_slug`](Self::check_slug) on this session only:
    /// nothing is persisted and the store-backed set is untouched. Returns
    /// the slug the grant was keyed under: the one supplied, or a stable
    /// digest of the capability.
    pub fn add_permission(
        &self,
        session: &mut AuthSession,
        capability: impl Into<String>,
        slug: Option<&str>,
    ) -> String {
        let capability = capability.into();
        let slug = match slug {
            Some(s) => s.to_string(),
            None => hex_sha256(capability.as_bytes()),
        };
        tracing::debug!("session-scoped grant {slug:?} for capability {capability:?}");
        session.grant(slug.clone(), capability);
        slug
    }

    /// Drop one identity's cached set. Called when role or permission
    /// assignments change for that identity. No-op without a cache.
    pub fn invalidate(&self, user: UserId) -> AuthResult<()> {
        if let Some(cache) = self.cache.as_ref() {
            cache.remove(&permission_cache_key(user))?;
            tracing::debug!("invalidated cached permissions for {user}");
        }
        Ok(())
    }

    /// Drop every cached set. Called on bulk role/permission edits.
    pub fn invalidate_all(&self) -> AuthResult<()> {
        if let Some(cache) = self.cache.as_ref() {
            cache.remove_tag(PERMISSION_CACHE_TAG)?;
            tracing::debug!("invalidated all cached permission sets");
        }
        Ok(())
    }

    fn resolve_for(&self, identity: Option<&Identity>) -> AuthResult<PermissionSet> {
        let Some(identity) = identity else {
            tracing::debug!("permission resolution on a guest session: empty set");
            return Ok(PermissionSet::empty());
        };
        let user = identity.id;

        let Some(cache) = self.shared_cache() else {
            return self.fetch_union(user);
        };

        // Same-identity resolutions serialize here so a burst of sessions
        // warming up together triggers one store read, not a storm.
        let slot = self.inflight.slot(user);
        let _guard = slot.lock().unwrap_or_else(|e| e.into_inner());

        let key = permission_cache_key(user);
        if let Some(records) = cache.get(&key)? {
            tracing::debug!(
                "permission set for {user} served from the shared cache ({} records)",
                records.len()
            );
            return Ok(PermissionSet::from_records(records));
        }

        let set = self.fetch_union(user)?;
        if !set.is_empty() {
            cache.set_tagged(PERMISSION_CACHE_TAG, &key, &set.records())?;
        }
        Ok(set)
    }

    fn fetch_union(&self, user: UserId) -> AuthResult<PermissionSet> {
        let mut ids: HashSet<PermissionId> = self
            .store
            .direct_permission_ids(user)?
            .into_iter()
            .collect();

        let roles = self.store.role_ids(user)?;
        if !roles.is_empty() {
            ids.extend(self.store.role_permission_ids(&roles)?);
        }

        if ids.is_empty() {
            tracing::debug!("no permissions granted to {user}");
            return Ok(PermissionSet::empty());
        }

        let ids: Vec<PermissionId> = ids.into_iter().collect();
        let records = self.store.permissions_by_ids(&ids)?;
        tracing::debug!("resolved {} permissions for {user} from the store", records.len());
        Ok(PermissionSet::from_records(records))
    }
}

/// One lock per identity, handed to concurrent resolutions of that identity.
/// Slots are never removed; the map is bounded by the identities that
/// resolve through this process.
#[derive(Default)]
struct InflightLocks {
    slots: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl InflightLocks {
    fn slot(&self, user: UserId) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(user).or_default().clone()
    }
}
