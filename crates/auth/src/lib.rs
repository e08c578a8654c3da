//! `wardgate-auth` — administrative authentication and authorization core.
//!
//! This crate is intentionally decoupled from HTTP and storage: callers bring
//! their own [`UserStore`]/[`PermissionStore`] adapters and an [`AuthSession`]
//! per request, and get back credential checks, opaque access tokens, and
//! set-union permission resolution with optional shared caching.

pub mod authenticator;
pub mod cache;
pub mod config;
pub mod error;
pub mod hasher;
pub mod identity;
pub mod menu;
pub mod permission;
pub mod resolver;
pub mod session;
pub mod store;

pub use authenticator::{AccessToken, Authenticator};
pub use cache::{permission_cache_key, PermissionCache, PERMISSION_CACHE_TAG};
pub use config::{AuthConfig, DEFAULT_MAX_FAILED_LOGINS, DEFAULT_PASSWORD_SALT};
pub use error::{AuthError, AuthResult};
pub use hasher::{constant_time_eq, PasswordHasher, SaltedDigest};
pub use identity::{Identity, IdentityInfo};
pub use menu::{MenuEntry, MenuResolver};
pub use permission::{Permission, PermissionSet, WILDCARD};
pub use resolver::PermissionResolver;
pub use session::AuthSession;
pub use store::{MenuStore, PermissionStore, UserStore};
