//! Errors reported by persistence backends.

use thiserror::Error;

use crate::model::UserId;

/// Failure of a store call.
///
/// Uniqueness and concurrency violations get their own variants so callers can
/// react to them; anything else the backend rejects is `Backend`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("prize '{0}' already exists")]
    DuplicatePrize(String),

    #[error("token '{0}' already exists")]
    DuplicateToken(String),

    #[error("token '{0}' not found")]
    TokenNotFound(String),

    #[error("token '{0}' already used")]
    TokenAlreadyUsed(String),

    #[error("token pool exhausted")]
    PoolExhausted,

    #[error("prize '{1}' already recorded for user {0}")]
    AlreadyRecorded(UserId, String),

    #[error("balance of user {0} was modified concurrently")]
    VersionConflict(UserId),

    #[error("storage backend failure: {0}")]
    Backend(String),
}
