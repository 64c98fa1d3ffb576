//! Core domain types for the rewards ledger.

use serde::{Deserialize, Serialize};

use crate::{Coins, Points};

/// Authenticated user identifier, supplied by the identity layer.
pub type UserId = String;

/// A request representing the possible inputs of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Earn points (or coins, in the upper tier) from one draw.
    Draw { user: UserId },
    /// A draw gated by a single-use ticket from the ticket pool.
    TicketDraw { user: UserId, ticket: String },
    /// Turn whole hundreds of coins into points.
    ConvertCoins { user: UserId },
    /// Exchange points for a prize and receive a redemption code.
    ExchangePrize { user: UserId, prize: String },
}

impl Request {
    pub fn user(&self) -> &str {
        match self {
            Request::Draw { user }
            | Request::TicketDraw { user, .. }
            | Request::ConvertCoins { user }
            | Request::ExchangePrize { user, .. } => user,
        }
    }

    /// Short name used in logs and csv input.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Draw { .. } => "draw",
            Request::TicketDraw { .. } => "ticket_draw",
            Request::ConvertCoins { .. } => "convert",
            Request::ExchangePrize { .. } => "exchange",
        }
    }
}

/// Points and coins held by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: UserId,
    pub points: Points,
    pub coins: Coins,
    /// Bumped by the store on every save; a save carrying a stale version is rejected.
    #[serde(default)]
    pub version: u64,
}

impl Balance {
    /// A fresh, empty balance.
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            points: Points::ZERO,
            coins: Coins::ZERO,
            version: 0,
        }
    }

    pub fn with_points(mut self, points: u64) -> Self {
        self.points = Points::new(points);
        self
    }

    pub fn with_coins(mut self, coins: u64) -> Self {
        self.coins = Coins::new(coins);
        self
    }
}

/// A prize and its point cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    pub name: String,
    pub cost: Points,
}

impl Prize {
    pub fn new(name: impl Into<String>, cost: u64) -> Self {
        Self {
            name: name.into(),
            cost: Points::new(cost),
        }
    }
}

/// A single-use token in a pool. Moves from available to used exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub used: bool,
}

/// Record of a prize handed to a user, keyed by `(user_id, prize_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangedPrize {
    pub user_id: UserId,
    pub prize_name: String,
    pub code: String,
}

impl ExchangedPrize {
    pub fn new(
        user_id: impl Into<UserId>,
        prize_name: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            prize_name: prize_name.into(),
            code: code.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_balance_is_empty() {
        let balance = Balance::new("alice");
        assert_eq!(balance.user_id, "alice");
        assert_eq!(balance.points, Points::ZERO);
        assert_eq!(balance.coins, Coins::ZERO);
        assert_eq!(balance.version, 0);
    }

    #[test]
    fn request_user_and_kind() {
        let request = Request::ExchangePrize {
            user: "bob".to_string(),
            prize: "mug".to_string(),
        };
        assert_eq!(request.user(), "bob");
        assert_eq!(request.kind(), "exchange");

        let request = Request::TicketDraw {
            user: "carol".to_string(),
            ticket: "T-1".to_string(),
        };
        assert_eq!(request.user(), "carol");
        assert_eq!(request.kind(), "ticket_draw");
    }
}
