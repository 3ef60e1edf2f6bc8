//! Target allocation: relative, non-negative weights per coin.

use std::collections::BTreeMap;

use crate::coin::Coin;
use crate::error::{Error, Result};

/// Relative target weights, e.g. `{BTC: 4, ETH: 1, XMR: 1}`.
///
/// Weights need not sum to one; the planner normalizes by their sum.
/// Kept in a `BTreeMap` so iteration order (and therefore the plan) is
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetWeights {
    weights: BTreeMap<Coin, f64>,
}

impl TargetWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from parallel coin / weight lists, as given on the command line.
    pub fn from_parts(coins: &[Coin], parts: &[f64]) -> Result<Self> {
        if coins.len() != parts.len() {
            return Err(Error::Config(format!(
                "{} coins but {} weights",
                coins.len(),
                parts.len()
            )));
        }
        Self::from_pairs(coins.iter().copied().zip(parts.iter().copied()))
    }

    /// Build from `(coin, weight)` pairs, rejecting duplicates and invalid weights.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Coin, f64)>) -> Result<Self> {
        let mut targets = Self::new();
        for (coin, weight) in pairs {
            if targets.weights.contains_key(&coin) {
                return Err(Error::Config(format!("duplicate coin: {coin}")));
            }
            targets.set(coin, weight)?;
        }
        Ok(targets)
    }

    /// Set (or replace) the weight of one coin.
    pub fn set(&mut self, coin: Coin, weight: f64) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::Config(format!(
                "weight for {coin} must be finite and non-negative, got {weight}"
            )));
        }
        self.weights.insert(coin, weight);
        Ok(())
    }

    /// Weight of `coin`, zero if absent.
    pub fn weight(&self, coin: &Coin) -> f64 {
        self.weights.get(coin).copied().unwrap_or(0.0)
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Coins with a strictly positive weight, in ascending order.
    pub fn coins(&self) -> impl Iterator<Item = Coin> + '_ {
        self.weights
            .iter()
            .filter(|(_, w)| **w > 0.0)
            .map(|(c, _)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coin, f64)> + '_ {
        self.weights.iter().map(|(c, w)| (*c, *w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
