// SPDX-License-Identifier: MIT OR Apache-2.0

use plenum_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The action requires an authenticated session.
    #[error("action requires an authenticated session")]
    Unauthenticated,

    /// The user is authenticated but lacks the required rights.
    #[error("permission denied")]
    PermissionDenied,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error shape for the default presentation layer.
///
/// `NotFound` and `PermissionDenied` are deliberately not distinguished
/// here: content under a context the user cannot see renders as "not
/// available" either way, so the existence of private content does not leak
/// through error messages. This is policy, not an omission.
#[derive(Debug, Error)]
pub enum PublicError {
    #[error("not available")]
    NotAvailable,

    #[error("sign in required")]
    Unauthenticated,

    /// Key collision on insert, surfaced as an actionable validation error.
    #[error("an entry named '{0}' already exists here")]
    Conflict(String),

    /// Input failed validation; the message is safe to show.
    #[error("{0}")]
    Invalid(String),

    #[error("temporarily unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for PublicError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => PublicError::NotAvailable,
            StoreError::KeyConflict { key } => PublicError::Conflict(key),
            StoreError::Transient(reason) => PublicError::Unavailable(reason),
            StoreError::Payload(err) => PublicError::Unavailable(err.to_string()),
        }
    }
}

impl From<AuthError> for PublicError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => PublicError::Unauthenticated,
            AuthError::PermissionDenied => PublicError::NotAvailable,
            AuthError::Store(err) => err.into(),
        }
    }
}
