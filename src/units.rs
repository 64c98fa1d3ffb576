use std::fmt;

use serde::{Deserialize, Serialize};

/// Reward points held by a user. Unsigned, so a balance can never go negative.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Points(u64);

/// Coins earned from high-tier draws, convertible into [`Points`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Coins(u64);

impl Points {
    pub const ZERO: Points = Points(0);

    pub const fn new(value: u64) -> Self {
        Points(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Subtract `rhs`, or `None` if that would take the balance below zero.
    pub fn checked_sub(self, rhs: Points) -> Option<Points> {
        self.0.checked_sub(rhs.0).map(Points)
    }
}

impl Coins {
    pub const ZERO: Coins = Coins(0);

    pub const fn new(value: u64) -> Self {
        Coins(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Split into whole points at `rate` coins per point and the leftover coins.
    ///
    /// A zero rate converts nothing.
    pub fn split(self, rate: u64) -> (Points, Coins) {
        if rate == 0 {
            return (Points::ZERO, self);
        }
        (Points(self.0 / rate), Coins(self.0 % rate))
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for Points {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Points(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Points {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::ops::Add for Coins {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Coins(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Coins {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}
