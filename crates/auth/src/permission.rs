//! Permission records and the resolved permission set.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use wardgate_core::PermissionId;

/// Marker inside `http_path` that turns a permission into a prefix rule.
pub const WILDCARD: char = '*';

/// A single grantable capability. Read-only reference data from the
/// permission store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    /// Route pattern; may contain [`WILDCARD`] to grant a whole prefix.
    pub http_path: String,
    /// HTTP verb, matched exactly and case-sensitively.
    pub http_method: String,
    /// Stable name for non-route capabilities (a UI button, an export job).
    pub slug: Option<String>,
}

impl Permission {
    pub fn route(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: PermissionId::new(),
            http_path: path.into(),
            http_method: method.into(),
            slug: None,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn is_wildcard(&self) -> bool {
        self.http_path.contains(WILDCARD)
    }
}

/// De-duplicated union of an identity's direct and role-inherited
/// permissions, keyed by permission id.
///
/// An empty set is a real, memoizable value (an identity with no grants),
/// and every query against it answers `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    by_id: HashMap<PermissionId, Permission>,
}

impl PermissionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Collect records into the set. Rows sharing an id collapse to one
    /// entry (last one wins; the store returns each id once anyway).
    pub fn from_records(records: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            by_id: records.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.by_id.values()
    }

    /// Clone the records out, e.g. for a shared-cache write.
    pub fn records(&self) -> Vec<Permission> {
        self.by_id.values().cloned().collect()
    }

    /// Route query. Exact `http_path` + `http_method` equality wins first;
    /// otherwise wildcard rules with the same method apply: strip every
    /// marker from the pattern and match if the request path contains the
    /// remainder (or starts with it, when `anchored` is set).
    pub fn allows_route(&self, path: &str, method: &str, anchored: bool) -> bool {
        let exact = self
            .by_id
            .values()
            .any(|p| p.http_path == path && p.http_method == method);
        if exact {
            return true;
        }

        self.by_id
            .values()
            .filter(|p| p.http_method == method && p.is_wildcard())
            .any(|p| {
                let prefix: String = p.http_path.replace(WILDCARD, "");
                if anchored {
                    path.starts_with(&prefix)
                } else {
                    path.contains(&prefix)
                }
            })
    }

    /// Named-capability query over the stored slugs.
    pub fn allows_slug(&self, slug: &str) -> bool {
        self.by_id
            .values()
            .any(|p| p.slug.as_deref() == Some(slug))
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self::from_records(iter)
    }
}
