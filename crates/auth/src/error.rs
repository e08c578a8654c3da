//! Authentication and authorization error taxonomy.

use thiserror::Error;
use wardgate_core::StoreError;

/// Result type used by the authenticator and the permission resolver.
pub type AuthResult<T> = Result<T, AuthError>;

/// Failure raised by login, token handling, or permission resolution.
///
/// A denied authorization is never an error: `check`/`check_slug` return
/// `Ok(false)` for missing permissions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown username or wrong password. The two cases are deliberately
    /// indistinguishable to the caller.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The stored failure count exceeded the configured threshold. Only an
    /// operator resetting the count out-of-band unlocks the account.
    #[error("account locked after repeated failed logins")]
    AccountLocked,

    /// The operating system refused to produce randomness for a new token.
    #[error("token minting failed: {0}")]
    TokenMint(String),

    /// A backing-store fault, propagated unmodified.
    #[error(transparent)]
    Store(#[from] StoreError),
}
