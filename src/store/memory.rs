//! In-memory store implementations.
//!
//! Keyed records live in `DashMap`s and rely on its entry API for atomic
//! get-or-create and insert-if-absent. The token pool keeps its state behind
//! one mutex so that picking a token and flipping its flag cannot be split.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

use super::{LedgerStore, PrizeCatalog, RedemptionLedger, Result, StoreError, TokenPool};
use crate::Points;
use crate::model::{Balance, ExchangedPrize, Prize, Token, UserId};

/// Balances keyed by user id, with optimistic versioning on save.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    balances: DashMap<UserId, Balance>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_or_create(&self, user_id: &str) -> Result<Balance> {
        let entry = self
            .balances
            .entry(user_id.to_string())
            .or_insert_with(|| Balance::new(user_id));
        Ok(entry.value().clone())
    }

    async fn save(&self, balance: &Balance) -> Result<Balance> {
        let mut stored = balance.clone();
        stored.version = balance.version + 1;

        match self.balances.entry(balance.user_id.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().version != balance.version {
                    return Err(StoreError::VersionConflict(balance.user_id.clone()));
                }
                entry.insert(stored.clone());
            }
            Entry::Vacant(entry) => {
                if balance.version != 0 {
                    return Err(StoreError::VersionConflict(balance.user_id.clone()));
                }
                entry.insert(stored.clone());
            }
        }

        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<Balance>> {
        let mut balances: Vec<_> = self
            .balances
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        balances.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(balances)
    }
}

/// Prizes keyed by name.
#[derive(Debug, Default)]
pub struct MemoryPrizeCatalog {
    prizes: DashMap<String, Prize>,
}

impl MemoryPrizeCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrizeCatalog for MemoryPrizeCatalog {
    async fn add(&self, name: &str, cost: Points) -> Result<()> {
        match self.prizes.entry(name.to_string()) {
            Entry::Occupied(_) => Err(StoreError::DuplicatePrize(name.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(Prize {
                    name: name.to_string(),
                    cost,
                });
                Ok(())
            }
        }
    }

    async fn get(&self, name: &str) -> Result<Option<Prize>> {
        Ok(self.prizes.get(name).map(|prize| prize.clone()))
    }

    async fn list(&self) -> Result<Vec<Prize>> {
        let mut prizes: Vec<_> = self
            .prizes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        prizes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(prizes)
    }
}

#[derive(Debug, Default)]
struct PoolState {
    /// token -> used
    tokens: HashMap<String, bool>,
    /// Allocation order. May still hold tokens that were consumed by value;
    /// `allocate` skips those.
    queue: VecDeque<String>,
    unused: usize,
}

/// Single-use tokens handed out in insertion order.
#[derive(Debug, Default)]
pub struct MemoryTokenPool {
    state: Mutex<PoolState>,
}

impl MemoryTokenPool {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenPool for MemoryTokenPool {
    async fn add(&self, token: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.tokens.contains_key(token) {
            return Err(StoreError::DuplicateToken(token.to_string()));
        }
        state.tokens.insert(token.to_string(), false);
        state.queue.push_back(token.to_string());
        state.unused += 1;
        Ok(())
    }

    async fn allocate(&self) -> Result<String> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        while let Some(token) = state.queue.pop_front() {
            if let Some(used) = state.tokens.get_mut(&token) {
                if !*used {
                    *used = true;
                    state.unused -= 1;
                    return Ok(token);
                }
            }
        }
        Err(StoreError::PoolExhausted)
    }

    async fn consume(&self, token: &str) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        match state.tokens.get_mut(token) {
            None => Err(StoreError::TokenNotFound(token.to_string())),
            Some(true) => Err(StoreError::TokenAlreadyUsed(token.to_string())),
            Some(used) => {
                *used = true;
                state.unused -= 1;
                Ok(())
            }
        }
    }

    async fn get(&self, token: &str) -> Result<Option<Token>> {
        let state = self.state.lock();
        Ok(state.tokens.get(token).map(|used| Token {
            value: token.to_string(),
            used: *used,
        }))
    }

    async fn available(&self) -> Result<usize> {
        Ok(self.state.lock().unused)
    }
}

/// Exchanged prizes keyed by `(user, prize)`.
#[derive(Debug, Default)]
pub struct MemoryRedemptionLedger {
    records: DashMap<(UserId, String), ExchangedPrize>,
}

impl MemoryRedemptionLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RedemptionLedger for MemoryRedemptionLedger {
    async fn get(&self, user_id: &str, prize_name: &str) -> Result<Option<ExchangedPrize>> {
        let key = (user_id.to_string(), prize_name.to_string());
        Ok(self.records.get(&key).map(|record| record.clone()))
    }

    async fn record(&self, exchanged: &ExchangedPrize) -> Result<()> {
        let key = (exchanged.user_id.clone(), exchanged.prize_name.clone());
        match self.records.entry(key) {
            Entry::Occupied(_) => Err(StoreError::AlreadyRecorded(
                exchanged.user_id.clone(),
                exchanged.prize_name.clone(),
            )),
            Entry::Vacant(entry) => {
                entry.insert(exchanged.clone());
                Ok(())
            }
        }
    }

    async fn list(&self) -> Result<Vec<ExchangedPrize>> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| {
            (&a.user_id, &a.prize_name).cmp(&(&b.user_id, &b.prize_name))
        });
        Ok(records)
    }
}
