//! Error types callers branch on.

use thiserror::Error;

/// Returned by a persistence backend when the user's session is no longer
/// valid (expired or revoked refresh token). The store reacts by signing out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("session expired: {0}")]
pub struct SessionExpired(pub String);

#[derive(Error, Debug)]
pub enum StoreError {
    /// No authenticated identity to key the write on
    #[error("not signed in")]
    NotSignedIn,

    /// The backend rejected the session; local state has been reset
    #[error("session expired, signed out")]
    SessionExpired,

    /// Budget category blank or limit negative / not finite
    #[error("invalid budget: {0}")]
    InvalidBudget(String),

    /// The persistence backend failed
    #[error("persistence error: {0:#}")]
    Persistence(anyhow::Error),
}

/// True when `err` (or anything in its chain) is a [`SessionExpired`].
pub fn is_session_expired(err: &anyhow::Error) -> bool {
    err.chain().any(|e| e.is::<SessionExpired>())
}
