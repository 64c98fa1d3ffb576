//! Error types for rewards operations.

use thiserror::Error;

use crate::model::UserId;
use crate::store::StoreError;
use crate::{Coins, Points};

/// Top-level error returned by [`Engine`](super::Engine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("draw failed: {0}")]
    Draw(#[from] DrawError),

    #[error("coin conversion failed: {0}")]
    Convert(#[from] ConvertError),

    #[error("prize exchange failed: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("ticket rejected: {0}")]
    Ticket(#[from] TicketError),

    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Error during a draw.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("user {0} has {1} points, draws stop at the limit")]
    LimitExceeded(UserId, Points),
}

/// Error during coin conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("user {0} has only {1} coins")]
    InsufficientCoins(UserId, Coins),
}

/// Error during a prize exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("prize '{0}' not found")]
    PrizeNotFound(String),

    #[error("insufficient points for user {0}: available {1}, required {2}")]
    InsufficientPoints(UserId, Points, Points),

    #[error("no redemption codes available")]
    NoCodesAvailable,
}

/// Error while consuming a draw ticket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    #[error("ticket '{0}' not found")]
    NotFound(String),

    #[error("ticket '{0}' has already been used")]
    AlreadyUsed(String),
}

/// Broad class of an [`EngineError`], for callers deciding how to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    BusinessRuleViolation,
    ResourceExhausted,
    StorageFailure,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Draw(_) | EngineError::Convert(_) => ErrorKind::BusinessRuleViolation,
            EngineError::Exchange(ExchangeError::PrizeNotFound(_)) => ErrorKind::NotFound,
            EngineError::Exchange(ExchangeError::InsufficientPoints(..)) => {
                ErrorKind::BusinessRuleViolation
            }
            EngineError::Exchange(ExchangeError::NoCodesAvailable) => ErrorKind::ResourceExhausted,
            EngineError::Ticket(TicketError::NotFound(_)) => ErrorKind::NotFound,
            EngineError::Ticket(TicketError::AlreadyUsed(_)) => ErrorKind::Conflict,
            EngineError::Store(e) => match e {
                StoreError::TokenNotFound(_) => ErrorKind::NotFound,
                StoreError::DuplicatePrize(_)
                | StoreError::DuplicateToken(_)
                | StoreError::TokenAlreadyUsed(_)
                | StoreError::AlreadyRecorded(..)
                | StoreError::VersionConflict(_) => ErrorKind::Conflict,
                StoreError::PoolExhausted => ErrorKind::ResourceExhausted,
                StoreError::Backend(_) => ErrorKind::StorageFailure,
            },
        }
    }

    /// Only storage failures are worth retrying; everything else is final
    /// for the request.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StorageFailure
    }
}
