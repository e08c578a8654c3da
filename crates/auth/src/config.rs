//! Tunables for the authenticator and the permission resolver.

use serde::{Deserialize, Serialize};

/// Salt mixed into digests by the default password strategy when the
/// embedder does not configure one.
pub const DEFAULT_PASSWORD_SALT: &str = "wardgate";

/// Default failed-login threshold.
pub const DEFAULT_MAX_FAILED_LOGINS: u32 = 10;

/// Authorization core configuration.
///
/// All fields have working defaults; embedders override the ones they care
/// about through the `with_*` builders or by deserializing a config file
/// (missing fields fall back to the defaults).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lockout threshold. A login attempt is rejected with `AccountLocked`
    /// once the stored failure count is strictly greater than this value.
    pub max_failed_logins: u32,

    /// Salt consumed by the default digest strategy.
    pub password_salt: String,

    /// Probe and write through a shared [`PermissionCache`] during
    /// resolution. Off by default; the per-session memo always applies.
    ///
    /// [`PermissionCache`]: crate::cache::PermissionCache
    pub cache_permissions: bool,

    /// Require wildcard prefixes to anchor at the start of the request path.
    /// Off by default: the legacy behavior matches the stripped prefix
    /// anywhere inside the path.
    pub anchored_wildcards: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_failed_logins: DEFAULT_MAX_FAILED_LOGINS,
            password_salt: DEFAULT_PASSWORD_SALT.to_string(),
            cache_permissions: false,
            anchored_wildcards: false,
        }
    }
}

impl AuthConfig {
    pub fn with_max_failed_logins(mut self, max: u32) -> Self {
        self.max_failed_logins = max;
        self
    }

    pub fn with_password_salt(mut self, salt: impl Into<String>) -> Self {
        self.password_salt = salt.into();
        self
    }

    pub fn with_cache_permissions(mut self, enabled: bool) -> Self {
        self.cache_permissions = enabled;
        self
    }

    pub fn with_anchored_wildcards(mut self, anchored: bool) -> Self {
        self.anchored_wildcards = anchored;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AuthConfig::default();
        assert_eq!(config.max_failed_logins, 10);
        assert_eq!(config.password_salt, "wardgate");
        assert!(!config.cache_permissions);
        assert!(!config.anchored_wildcards);
    }

    #[test]
    fn partial_config_files_fall_back_to_defaults() {
        let config: AuthConfig = serde_json::from_str(r#"{"max_failed_logins": 3}"#).unwrap();
        assert_eq!(config.max_failed_logins, 3);
        assert_eq!(config.password_salt, DEFAULT_PASSWORD_SALT);
    }

    #[test]
    fn builders_chain() {
        let config = AuthConfig::default()
            .with_max_failed_logins(5)
            .with_password_salt("pepper")
            .with_cache_permissions(true)
            .with_anchored_wildcards(true);
        assert_eq!(config.max_failed_logins, 5);
        assert_eq!(config.password_salt, "pepper");
        assert!(config.cache_permissions);
        assert!(config.anchored_wildcards);
    }
}
