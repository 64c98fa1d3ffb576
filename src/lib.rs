pub mod config;
pub mod csv;
pub mod engine;
pub mod model;
pub mod store;
pub mod units;

pub use engine::{Engine, EngineError, Outcome, RewardsPolicy};
pub use model::{Balance, ExchangedPrize, Prize, Request, UserId};
pub use store::Stores;
pub use units::{Coins, Points};
