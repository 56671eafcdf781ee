// SPDX-License-Identifier: MIT OR Apache-2.0

use plenum_auth::{AuthError, PublicError};
use plenum_core::PayloadError;
use plenum_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("node not found")]
    NotFound,

    #[error("node is not a poll")]
    NotAPoll,

    #[error("node is not a speaker list")]
    NotASpeakerlist,

    #[error("node does not scope a permission context")]
    NotAContext,

    #[error("poll is closed, no further ballots are accepted")]
    PollClosed,

    #[error("ballot rejected: {0}")]
    InvalidBallot(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl From<EngineError> for PublicError {
    fn from(err: EngineError) -> Self {
        match err {
            // Absence and denial render identically on purpose; see
            // `plenum_auth::PublicError`.
            EngineError::NotFound
            | EngineError::NotAPoll
            | EngineError::NotASpeakerlist
            | EngineError::NotAContext => PublicError::NotAvailable,
            EngineError::PollClosed => {
                PublicError::Invalid("the poll has already been closed".to_string())
            }
            EngineError::InvalidBallot(reason) => PublicError::Invalid(reason),
            EngineError::Auth(err) => err.into(),
            EngineError::Store(err) => err.into(),
            EngineError::Payload(err) => PublicError::Invalid(err.to_string()),
        }
    }
}
