//! Rewards engine.
//!
//! The engine applies draws, coin conversions and prize exchanges on top of
//! the injected [`Stores`]. Every operation that reads and writes a balance
//! holds that user's lock for the whole read-modify-write, so requests for the
//! same user serialize while different users proceed in parallel. Balance
//! saves are also versioned, which catches writers that bypass this engine's
//! locks (another engine instance sharing the same stores).

use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::model::{Balance, ExchangedPrize, Prize, Request};
use crate::store::{StoreError, Stores};
use crate::Points;

mod error;
mod locks;
mod rules;

pub use error::{ConvertError, DrawError, EngineError, ErrorKind, ExchangeError, TicketError};
pub use locks::{UserGuard, UserLocks};
pub use rules::{DrawReward, ExchangeCost, RewardsPolicy};

/// The result of a successfully applied [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The user's balance after a draw or conversion.
    Balance(Balance),
    /// The prize record, fresh or pre-existing, after an exchange.
    Exchanged(ExchangedPrize),
}

/// Counters reported by [`Engine::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub applied: usize,
    pub skipped: usize,
}

/// The rewards engine.
///
/// Cheap to clone; clones share stores and user locks.
#[derive(Clone)]
pub struct Engine {
    stores: Stores,
    policy: RewardsPolicy,
    locks: UserLocks,
}

/// Public API
impl Engine {
    pub fn new(stores: Stores, policy: RewardsPolicy) -> Self {
        Self {
            stores,
            policy,
            locks: UserLocks::new(),
        }
    }

    /// An engine over fresh in-memory stores with the default policy.
    pub fn in_memory() -> Self {
        Self::new(Stores::in_memory(), RewardsPolicy::default())
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn policy(&self) -> &RewardsPolicy {
        &self.policy
    }

    /// Run the engine over a stream of requests, one at a time.
    pub async fn run(&self, mut stream: impl Stream<Item = Request> + Unpin) -> RunStats {
        let mut stats = RunStats::default();
        while let Some(request) = stream.next().await {
            // a failed request must not stop the engine, it is logged by `apply`
            match self.apply(request).await {
                Ok(_) => stats.applied += 1,
                Err(_) => stats.skipped += 1,
            }
        }
        stats
    }

    /// Apply a single request.
    pub async fn apply(&self, request: Request) -> Result<Outcome, EngineError> {
        let result = match &request {
            Request::Draw { user } => self.draw(user).await.map(Outcome::Balance),
            Request::TicketDraw { user, ticket } => self
                .draw_with_ticket(user, ticket)
                .await
                .map(Outcome::Balance),
            Request::ConvertCoins { user } => self.convert_coins(user).await.map(Outcome::Balance),
            Request::ExchangePrize { user, prize } => self
                .exchange_prize(user, prize)
                .await
                .map(Outcome::Exchanged),
        };
        Self::log_result(&request, &result);
        result
    }

    /// The user's balance, created empty on first access.
    pub async fn balance(&self, user: &str) -> Result<Balance, EngineError> {
        Ok(self.stores.ledger.get_or_create(user).await?)
    }

    /// All balances, sorted by user.
    pub async fn balances(&self) -> Result<Vec<Balance>, EngineError> {
        Ok(self.stores.ledger.list().await?)
    }

    pub async fn prize(&self, name: &str) -> Result<Prize, EngineError> {
        self.stores
            .prizes
            .get(name)
            .await?
            .ok_or_else(|| ExchangeError::PrizeNotFound(name.to_string()).into())
    }

    /// The prize record for `(user, prize)`, if the user already exchanged it.
    pub async fn redemption(
        &self,
        user: &str,
        prize: &str,
    ) -> Result<Option<ExchangedPrize>, EngineError> {
        Ok(self.stores.redemptions.get(user, prize).await?)
    }

    pub async fn redemptions(&self) -> Result<Vec<ExchangedPrize>, EngineError> {
        Ok(self.stores.redemptions.list().await?)
    }

    /// One draw:
    /// - below the points ceiling, earn points
    /// - up to the draw limit, earn coins
    /// - at the limit, refuse
    #[instrument(skip(self))]
    pub async fn draw(&self, user: &str) -> Result<Balance, EngineError> {
        let _guard = self.locks.lock(user).await;

        let mut balance = self.stores.ledger.get_or_create(user).await?;
        self.policy.draw(&mut balance)?;

        Ok(self.stores.ledger.save(&balance).await?)
    }

    /// A draw paid for with a single-use ticket.
    ///
    /// The tier rules are checked before the ticket is consumed, so a refused
    /// draw leaves the ticket available.
    #[instrument(skip(self))]
    pub async fn draw_with_ticket(&self, user: &str, ticket: &str) -> Result<Balance, EngineError> {
        let _guard = self.locks.lock(user).await;

        let mut balance = self.stores.ledger.get_or_create(user).await?;
        self.policy.draw(&mut balance)?;

        self.stores
            .tickets
            .consume(ticket)
            .await
            .map_err(|e| match e {
                StoreError::TokenNotFound(t) => EngineError::from(TicketError::NotFound(t)),
                StoreError::TokenAlreadyUsed(t) => EngineError::from(TicketError::AlreadyUsed(t)),
                other => EngineError::from(other),
            })?;

        self.stores.ledger.save(&balance).await.map_err(|e| {
            warn!(user, ticket, reason = %e, "ticket consumed but draw not saved");
            EngineError::from(e)
        })
    }

    /// Convert whole hundreds of coins into points, keeping the remainder.
    #[instrument(skip(self))]
    pub async fn convert_coins(&self, user: &str) -> Result<Balance, EngineError> {
        let _guard = self.locks.lock(user).await;

        let mut balance = self.stores.ledger.get_or_create(user).await?;
        self.policy.convert(&mut balance)?;

        Ok(self.stores.ledger.save(&balance).await?)
    }

    /// Exchange points for a prize:
    /// - the prize must exist
    /// - a user who already holds this prize gets the same code back
    /// - otherwise the user needs at least the prize cost in points
    /// - a code is taken from the pool and recorded against `(user, prize)`
    /// - with [`ExchangeCost::Deduct`], the cost is taken from the balance
    ///   before the record is written and given back if the record fails
    #[instrument(skip(self))]
    pub async fn exchange_prize(
        &self,
        user: &str,
        prize_name: &str,
    ) -> Result<ExchangedPrize, EngineError> {
        let prize = self.prize(prize_name).await?;

        let _guard = self.locks.lock(user).await;

        if let Some(existing) = self.stores.redemptions.get(user, prize_name).await? {
            debug!(user, prize = prize_name, code = %existing.code, "prize already exchanged");
            return Ok(existing);
        }

        let mut balance = self.stores.ledger.get_or_create(user).await?;
        if balance.points < prize.cost {
            return Err(ExchangeError::InsufficientPoints(
                user.to_string(),
                balance.points,
                prize.cost,
            )
            .into());
        }

        let code = match self.stores.codes.allocate().await {
            Ok(code) => code,
            Err(StoreError::PoolExhausted) => return Err(ExchangeError::NoCodesAvailable.into()),
            Err(e) => return Err(e.into()),
        };

        // with Deduct the charge is saved before the record, so a committed
        // record always has its points taken
        let charged = match self.policy.exchange_cost {
            ExchangeCost::Gate => None,
            ExchangeCost::Deduct => {
                balance.points = balance.points.checked_sub(prize.cost).ok_or_else(|| {
                    ExchangeError::InsufficientPoints(user.to_string(), balance.points, prize.cost)
                })?;
                match self.stores.ledger.save(&balance).await {
                    Ok(saved) => Some(saved),
                    Err(e) => {
                        warn!(user, prize = prize_name, burned = %code, reason = %e, "exchange charge not saved");
                        return Err(e.into());
                    }
                }
            }
        };

        let exchanged = ExchangedPrize::new(user, prize_name, code);
        match self.stores.redemptions.record(&exchanged).await {
            Ok(()) => {}
            Err(StoreError::AlreadyRecorded(..)) => {
                // someone else committed this pair first; their code stands
                // and ours stays consumed
                warn!(
                    user,
                    prize = prize_name,
                    burned = %exchanged.code,
                    "lost redemption race"
                );
                if let Some(charged) = charged {
                    self.refund(charged, prize.cost).await;
                }
                return self
                    .stores
                    .redemptions
                    .get(user, prize_name)
                    .await?
                    .ok_or_else(|| {
                        StoreError::Backend(format!(
                            "redemption of '{prize_name}' for user {user} reported but missing"
                        ))
                        .into()
                    });
            }
            Err(e) => {
                warn!(user, prize = prize_name, burned = %exchanged.code, reason = %e, "redemption not recorded");
                if let Some(charged) = charged {
                    self.refund(charged, prize.cost).await;
                }
                return Err(e.into());
            }
        }

        Ok(exchanged)
    }
}

/// Administrative API, used to seed the catalog and the token pools.
impl Engine {
    pub async fn add_prize(&self, name: &str, cost: u64) -> Result<(), EngineError> {
        Ok(self.stores.prizes.add(name, Points::new(cost)).await?)
    }

    pub async fn add_code(&self, code: &str) -> Result<(), EngineError> {
        Ok(self.stores.codes.add(code).await?)
    }

    pub async fn add_ticket(&self, ticket: &str) -> Result<(), EngineError> {
        Ok(self.stores.tickets.add(ticket).await?)
    }

    /// Add every prize, skipping (and logging) the ones that fail.
    /// Returns how many were added.
    pub async fn load_prizes(&self, prizes: impl IntoIterator<Item = Prize>) -> usize {
        let mut added = 0;
        for prize in prizes {
            match self.stores.prizes.add(&prize.name, prize.cost).await {
                Ok(()) => added += 1,
                Err(e) => warn!(prize = %prize.name, reason = %e, "prize skipped"),
            }
        }
        added
    }

    /// Add every redemption code, skipping (and logging) the ones that fail.
    pub async fn load_codes(&self, codes: impl IntoIterator<Item = String>) -> usize {
        Self::load_tokens("code", self.stores.codes.as_ref(), codes).await
    }

    /// Add every draw ticket, skipping (and logging) the ones that fail.
    pub async fn load_tickets(&self, tickets: impl IntoIterator<Item = String>) -> usize {
        Self::load_tokens("ticket", self.stores.tickets.as_ref(), tickets).await
    }
}

/// Private API
impl Engine {
    /// Give back an exchange charge whose redemption was not recorded.
    async fn refund(&self, mut charged: Balance, cost: Points) {
        charged.points += cost;
        if let Err(e) = self.stores.ledger.save(&charged).await {
            warn!(user = %charged.user_id, cost = %cost, reason = %e, "exchange charge not refunded");
        }
    }

    async fn load_tokens(
        pool_name: &str,
        pool: &dyn crate::store::TokenPool,
        tokens: impl IntoIterator<Item = String>,
    ) -> usize {
        let mut added = 0;
        for token in tokens {
            match pool.add(&token).await {
                Ok(()) => added += 1,
                Err(e) => warn!(pool = pool_name, token = %token, reason = %e, "token skipped"),
            }
        }
        added
    }

    /// Small helper to log `apply` results
    fn log_result(request: &Request, result: &Result<Outcome, EngineError>) {
        let kind = request.kind();
        match result {
            Ok(Outcome::Balance(balance)) => {
                info!(
                    user = %balance.user_id,
                    points = %balance.points,
                    coins = %balance.coins,
                    "{kind} applied"
                );
            }
            Ok(Outcome::Exchanged(exchanged)) => {
                info!(
                    user = %exchanged.user_id,
                    prize = %exchanged.prize_name,
                    code = %exchanged.code,
                    "{kind} applied"
                );
            }
            Err(e) => {
                info!(
                    user = request.user(),
                    reason = %e,
                    retryable = e.is_retryable(),
                    "{kind} skipped"
                );
            }
        }
    }
}
