//! Per-request authorization context.

use std::collections::HashMap;

use crate::identity::{Identity, IdentityInfo};
use crate::permission::PermissionSet;

/// Everything the core tracks for one inbound request or interactive
/// session: the bound identity, the memoized permission set, and ad-hoc
/// slug grants.
///
/// The request layer owns one `AuthSession` per request; passing it by
/// `&mut` gives the resolver exclusive access, so the memo needs no locking
/// and is computed at most once per session.
#[derive(Debug, Default)]
pub struct AuthSession {
    identity: Option<Identity>,
    resolved: Option<PermissionSet>,
    adhoc: HashMap<String, String>,
}

impl AuthSession {
    /// Session with nobody bound.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Session seeded with an identity, e.g. straight after
    /// [`resolve_token`](crate::authenticator::Authenticator::resolve_token).
    pub fn for_identity(identity: Identity) -> Self {
        let mut session = Self::default();
        session.bind(identity);
        session
    }

    /// Bind an identity. Rebinding drops the memo and any ad-hoc grants
    /// belonging to the previous principal.
    pub fn bind(&mut self, identity: Identity) {
        self.identity = Some(identity);
        self.resolved = None;
        self.adhoc.clear();
    }

    /// Back to anonymous: identity, memo, and grants all dropped.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True iff no identity is bound.
    pub fn is_guest(&self) -> bool {
        self.identity.is_none()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Sanitized view of the bound identity, if any.
    pub fn info(&self) -> Option<IdentityInfo> {
        self.identity.as_ref().map(Identity::info)
    }

    /// The memoized permission set: `None` until the first resolution this
    /// session, `Some` (possibly empty) afterwards.
    pub fn resolved(&self) -> Option<&PermissionSet> {
        self.resolved.as_ref()
    }

    pub(crate) fn take_memo(&mut self) -> Option<PermissionSet> {
        self.resolved.take()
    }

    pub(crate) fn memoize(&mut self, set: PermissionSet) -> &PermissionSet {
        self.resolved.insert(set)
    }

    pub(crate) fn grant(&mut self, slug: String, capability: String) {
        self.adhoc.insert(slug, capability);
    }

    pub(crate) fn has_grant(&self, slug: &str) -> bool {
        self.adhoc.contains_key(slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Permission;

    fn alice() -> Identity {
        Identity::provision("alice", "digest")
    }

    #[test]
    fn fresh_session_is_guest_with_nothing_resolved() {
        let session = AuthSession::anonymous();
        assert!(session.is_guest());
        assert!(session.identity().is_none());
        assert!(session.info().is_none());
        assert!(session.resolved().is_none());
    }

    #[test]
    fn binding_makes_the_session_authenticated() {
        let session = AuthSession::for_identity(alice());
        assert!(!session.is_guest());
        assert_eq!(session.info().map(|i| i.username), Some("alice".into()));
    }

    #[test]
    fn rebinding_drops_memo_and_grants() {
        let mut session = AuthSession::for_identity(alice());
        session.memoize(PermissionSet::from_records(vec![Permission::route(
            "/posts", "PUT",
        )]));
        session.grant("export".into(), "reports/export".into());

        session.bind(Identity::provision("bob", "digest"));
        assert!(session.resolved().is_none());
        assert!(!session.has_grant("export"));
    }

    #[test]
    fn reset_returns_to_anonymous() {
        let mut session = AuthSession::for_identity(alice());
        session.grant("export".into(), "reports/export".into());
        session.reset();
        assert!(session.is_guest());
        assert!(!session.has_grant("export"));
        assert!(session.resolved().is_none());
    }

    #[test]
    fn memoized_empty_set_is_distinct_from_unresolved() {
        let mut session = AuthSession::for_identity(alice());
        assert!(session.resolved().is_none());
        session.memoize(PermissionSet::empty());
        assert!(matches!(session.resolved(), Some(set) if set.is_empty()));
    }
}
