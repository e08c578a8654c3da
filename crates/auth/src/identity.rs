//! Administrative user records and their sanitized projection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use wardgate_core::UserId;

/// An administrative user as the user store holds it, credentials included.
///
/// Rows pre-exist in the store. The authenticator mutates the failure count
/// and the token in place and never deletes a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: UserId,
    /// Unique, case-sensitive lookup key.
    pub username: String,
    /// Stored digest, never the plaintext.
    pub password_hash: String,
    /// Monotonic within a lockout window; reset to zero by a successful login.
    pub login_fail_count: u32,
    /// Set on login, cleared on logout. An absent token never matches any
    /// presented token, including the empty string.
    pub access_token: Option<String>,
    pub real_name: String,
    pub avatar: Option<String>,
    /// Operator flag. Request layers may gate whole panels on it; route and
    /// slug checks ignore it.
    pub is_super: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Fresh row for provisioning flows (store seeding, bootstrap).
    pub fn provision(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let username = username.into();
        let now = Utc::now();
        Self {
            id: UserId::new(),
            real_name: username.clone(),
            username,
            password_hash: password_hash.into(),
            login_fail_count: 0,
            access_token: None,
            avatar: None,
            is_super: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_real_name(mut self, real_name: impl Into<String>) -> Self {
        self.real_name = real_name.into();
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn with_super(mut self, is_super: bool) -> Self {
        self.is_super = is_super;
        self
    }

    /// What the request layer may see of this row: no digest, no token.
    pub fn info(&self) -> IdentityInfo {
        IdentityInfo {
            id: self.id,
            username: self.username.clone(),
            real_name: self.real_name.clone(),
            avatar: self.avatar.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Serializable identity view handed to controllers and templates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityInfo {
    pub id: UserId,
    pub username: String,
    pub real_name: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
