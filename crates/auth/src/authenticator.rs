//! Credential verification and session-token lifecycle.

use std::sync::Arc;

use base64::Engine;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::hasher::{PasswordHasher, SaltedDigest};
use crate::identity::Identity;
use crate::session::AuthSession;
use crate::store::UserStore;

/// Opaque bearer token handed out by [`Authenticator::login`].
pub type AccessToken = String;

/// Proves who a caller is and manages the token standing in for them.
///
/// One `Authenticator` is shared across requests (all methods take `&self`);
/// per-request state lives in [`AuthSession`].
pub struct Authenticator {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    config: AuthConfig,
}

impl Authenticator {
    /// Authenticator with the default digest strategy, salted from the
    /// configuration.
    pub fn new(users: Arc<dyn UserStore>, config: AuthConfig) -> Self {
        let hasher = Arc::new(SaltedDigest::new(config.password_salt.clone()));
        Self {
            users,
            hasher,
            config,
        }
    }

    /// Authenticator with a custom digest strategy (e.g. an adaptive hash).
    pub fn with_hasher(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            hasher,
            config,
        }
    }

    /// Digest a plaintext with the configured strategy, e.g. when
    /// provisioning a user row.
    pub fn hash_password(&self, plaintext: &str) -> String {
        self.hasher.hash(plaintext)
    }

    /// Verify credentials and mint a fresh token.
    ///
    /// Flow: username lookup (absent → `InvalidCredentials`), lockout check
    /// (failure count strictly above the threshold → `AccountLocked`,
    /// nothing else runs), digest comparison (mismatch → failure count
    /// incremented and persisted, then `InvalidCredentials`), then on
    /// success a new token is stored, the failure count reset, and the row
    /// persisted before the token is returned. Every branch that mutates
    /// the row commits it before returning.
    pub fn login(&self, username: &str, password: &str) -> AuthResult<AccessToken> {
        let mut identity = match self.users.find_by_username(username)? {
            Some(row) => row,
            None => {
                tracing::warn!("login rejected for unknown username {username:?}");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if identity.login_fail_count > self.config.max_failed_logins {
            tracing::warn!(
                "login rejected for {username:?}: locked after {} failed attempts",
                identity.login_fail_count
            );
            return Err(AuthError::AccountLocked);
        }

        if !self.hasher.verify(password, &identity.password_hash) {
            identity.login_fail_count += 1;
            self.users.persist(&identity)?;
            tracing::warn!(
                "login rejected for {username:?}: bad password (failure {} of {})",
                identity.login_fail_count,
                self.config.max_failed_logins
            );
            return Err(AuthError::InvalidCredentials);
        }

        let token = mint_token()?;
        identity.access_token = Some(token.clone());
        identity.login_fail_count = 0;
        self.users.persist(&identity)?;
        tracing::info!("login succeeded for {username:?}");
        Ok(token)
    }

    /// Clear the bound identity's token and return the session to anonymous.
    ///
    /// Guest sessions are a no-op returning `Ok(false)`; the cleared row is
    /// persisted before the session state changes.
    pub fn logout(&self, session: &mut AuthSession) -> AuthResult<bool> {
        let Some(identity) = session.identity() else {
            return Ok(false);
        };

        let mut cleared = identity.clone();
        cleared.access_token = None;
        self.users.persist(&cleared)?;
        tracing::info!("logout for {:?}", cleared.username);
        session.reset();
        Ok(true)
    }

    /// Exact-match token lookup.
    ///
    /// An empty token never resolves, whatever the store holds: rows whose
    /// token was cleared must not become reachable through an empty probe.
    pub fn resolve_token(&self, token: &str) -> AuthResult<Option<Identity>> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self.users.find_by_token(token)?)
    }
}

/// 32 bytes of OS randomness, base64url without padding.
fn mint_token() -> AuthResult<AccessToken> {
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| AuthError::TokenMint(e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}
