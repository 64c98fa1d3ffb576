//! Persistence contracts used by the engine.
//!
//! Each store is an object-safe async trait so the engine can be handed any
//! backend (in-memory maps here, a database elsewhere) through [`Stores`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{Balance, ExchangedPrize, Prize, Token};
use crate::Points;

mod error;
pub mod memory;

pub use error::StoreError;
pub use memory::{MemoryLedgerStore, MemoryPrizeCatalog, MemoryRedemptionLedger, MemoryTokenPool};

pub type Result<T> = std::result::Result<T, StoreError>;

/// One balance record per user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load the user's balance, creating an empty one on first access.
    /// Concurrent first access must yield a single record.
    async fn get_or_create(&self, user_id: &str) -> Result<Balance>;

    /// Persist `balance` if its version matches the stored one and return the
    /// stored copy with the bumped version, or fail with `VersionConflict`.
    async fn save(&self, balance: &Balance) -> Result<Balance>;

    async fn list(&self) -> Result<Vec<Balance>>;
}

/// Prize name to point cost.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrizeCatalog: Send + Sync {
    async fn add(&self, name: &str, cost: Points) -> Result<()>;

    async fn get(&self, name: &str) -> Result<Option<Prize>>;

    async fn list(&self) -> Result<Vec<Prize>>;
}

/// A pool of single-use tokens.
///
/// Used twice: once for prize redemption codes and once for draw tickets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenPool: Send + Sync {
    async fn add(&self, token: &str) -> Result<()>;

    /// Claim any available token and mark it used in one step.
    async fn allocate(&self) -> Result<String>;

    /// Claim a specific token and mark it used in one step.
    async fn consume(&self, token: &str) -> Result<()>;

    async fn get(&self, token: &str) -> Result<Option<Token>>;

    /// Number of tokens not yet used.
    async fn available(&self) -> Result<usize>;
}

/// Prizes handed out, at most one per `(user, prize)`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedemptionLedger: Send + Sync {
    async fn get(&self, user_id: &str, prize_name: &str) -> Result<Option<ExchangedPrize>>;

    /// Insert the record, or fail with `AlreadyRecorded` if the pair exists.
    /// The existing record is never overwritten.
    async fn record(&self, exchanged: &ExchangedPrize) -> Result<()>;

    async fn list(&self) -> Result<Vec<ExchangedPrize>>;
}

/// The set of stores an engine works against.
#[derive(Clone)]
pub struct Stores {
    pub ledger: Arc<dyn LedgerStore>,
    pub prizes: Arc<dyn PrizeCatalog>,
    /// Prize redemption codes, handed out by exchanges.
    pub codes: Arc<dyn TokenPool>,
    /// Draw tickets, consumed by ticket-gated draws.
    pub tickets: Arc<dyn TokenPool>,
    pub redemptions: Arc<dyn RedemptionLedger>,
}

impl Stores {
    /// Fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            ledger: Arc::new(MemoryLedgerStore::new()),
            prizes: Arc::new(MemoryPrizeCatalog::new()),
            codes: Arc::new(MemoryTokenPool::new()),
            tickets: Arc::new(MemoryTokenPool::new()),
            redemptions: Arc::new(MemoryRedemptionLedger::new()),
        }
    }
}
