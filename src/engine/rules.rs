use serde::Deserialize;

use super::error::{ConvertError, DrawError};
use crate::model::Balance;
use crate::{Coins, Points};

/// How a prize's cost is applied on exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeCost {
    /// The cost is only an eligibility threshold; points are kept.
    #[default]
    Gate,
    /// The cost is subtracted from the user's points.
    Deduct,
}

/// What a successful draw paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReward {
    Points(Points),
    Coins(Coins),
}

/// Tier thresholds and conversion rates for the rewards rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewardsPolicy {
    /// Below this many points a draw pays points.
    pub draw_points_ceiling: u64,
    /// At or above this many points draws are refused.
    pub draw_limit: u64,
    pub draw_points: u64,
    pub draw_coins: u64,
    pub coins_per_point: u64,
    pub exchange_cost: ExchangeCost,
}

impl Default for RewardsPolicy {
    fn default() -> Self {
        Self {
            draw_points_ceiling: 40_000,
            draw_limit: 50_000,
            draw_points: 1_000,
            draw_coins: 10,
            coins_per_point: 100,
            exchange_cost: ExchangeCost::Gate,
        }
    }
}

impl RewardsPolicy {
    /// The reward a draw would pay on `balance`, without applying it.
    pub fn draw_reward(&self, balance: &Balance) -> Result<DrawReward, DrawError> {
        let points = balance.points.value();
        if points < self.draw_points_ceiling {
            Ok(DrawReward::Points(Points::new(self.draw_points)))
        } else if points < self.draw_limit {
            Ok(DrawReward::Coins(Coins::new(self.draw_coins)))
        } else {
            Err(DrawError::LimitExceeded(
                balance.user_id.clone(),
                balance.points,
            ))
        }
    }

    /// Apply one draw to `balance`:
    /// - points below the ceiling earn points
    /// - points between the ceiling and the limit earn coins
    /// - at the limit the draw is refused and the balance is untouched
    pub fn draw(&self, balance: &mut Balance) -> Result<DrawReward, DrawError> {
        let reward = self.draw_reward(balance)?;
        match reward {
            DrawReward::Points(points) => balance.points += points,
            DrawReward::Coins(coins) => balance.coins += coins,
        }
        Ok(reward)
    }

    /// Convert whole blocks of coins into points, keeping the remainder.
    /// Returns the points credited.
    pub fn convert(&self, balance: &mut Balance) -> Result<Points, ConvertError> {
        if self.coins_per_point == 0 || balance.coins.value() < self.coins_per_point {
            return Err(ConvertError::InsufficientCoins(
                balance.user_id.clone(),
                balance.coins,
            ));
        }

        let (points, rest) = balance.coins.split(self.coins_per_point);
        balance.points += points;
        balance.coins = rest;
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(points: u64, coins: u64) -> Balance {
        Balance::new("alice").with_points(points).with_coins(coins)
    }

    #[test]
    fn default_policy_matches_tiers() {
        let policy = RewardsPolicy::default();
        assert_eq!(policy.draw_points_ceiling, 40_000);
        assert_eq!(policy.draw_limit, 50_000);
        assert_eq!(policy.exchange_cost, ExchangeCost::Gate);
    }

    #[test]
    fn draw_below_ceiling_pays_points() {
        let policy = RewardsPolicy::default();
        let mut b = balance(39_500, 0);

        let reward = policy.draw(&mut b).unwrap();
        assert_eq!(reward, DrawReward::Points(Points::new(1_000)));
        assert_eq!(b.points, Points::new(40_500));
        assert_eq!(b.coins, Coins::ZERO);
    }

    #[test]
    fn draw_in_upper_tier_pays_coins() {
        let policy = RewardsPolicy::default();
        let mut b = balance(45_000, 0);

        let reward = policy.draw(&mut b).unwrap();
        assert_eq!(reward, DrawReward::Coins(Coins::new(10)));
        assert_eq!(b.points, Points::new(45_000));
        assert_eq!(b.coins, Coins::new(10));
    }

    #[test]
    fn draw_tier_boundaries() {
        let policy = RewardsPolicy::default();

        let mut b = balance(40_000, 0);
        assert_eq!(
            policy.draw(&mut b).unwrap(),
            DrawReward::Coins(Coins::new(10))
        );

        let mut b = balance(49_999, 0);
        assert_eq!(
            policy.draw(&mut b).unwrap(),
            DrawReward::Coins(Coins::new(10))
        );

        let mut b = balance(50_000, 0);
        assert!(policy.draw(&mut b).is_err());
    }

    #[test]
    fn draw_at_limit_leaves_balance_untouched() {
        let policy = RewardsPolicy::default();
        let mut b = balance(55_000, 30);

        let result = policy.draw(&mut b);
        assert_eq!(
            result,
            Err(DrawError::LimitExceeded(
                "alice".to_string(),
                Points::new(55_000)
            ))
        );
        assert_eq!(b, balance(55_000, 30));
    }

    #[test]
    fn convert_keeps_remainder() {
        let policy = RewardsPolicy::default();
        let mut b = balance(10, 250);

        let credited = policy.convert(&mut b).unwrap();
        assert_eq!(credited, Points::new(2));
        assert_eq!(b.points, Points::new(12));
        assert_eq!(b.coins, Coins::new(50));
    }

    #[test]
    fn convert_below_rate_fails() {
        let policy = RewardsPolicy::default();
        let mut b = balance(0, 50);

        let result = policy.convert(&mut b);
        assert_eq!(
            result,
            Err(ConvertError::InsufficientCoins(
                "alice".to_string(),
                Coins::new(50)
            ))
        );
        assert_eq!(b.coins, Coins::new(50));
    }

    #[test]
    fn convert_always_leaves_less_than_rate() {
        let policy = RewardsPolicy::default();
        for coins in [100, 101, 199, 200, 999, 12_345] {
            let mut b = balance(0, coins);
            let credited = policy.convert(&mut b).unwrap();
            assert!(b.coins.value() < 100);
            assert_eq!(credited.value(), coins / 100);
        }
    }
}
