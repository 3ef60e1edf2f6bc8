//! Point-in-time view of account balances and market prices.
//!
//! A snapshot is taken once per run and cached for the run's duration; the
//! planner never talks to the exchange directly.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::coin::Coin;
use crate::error::{Error, Result};
use crate::exchange::Exchange;
use crate::types::MarketInfo;

/// Balances at or below this amount are treated as not held (one satoshi).
pub const DEFAULT_DUST: f64 = 1e-8;

/// Balances and best bid/ask per coin, with the quote currency they are priced in.
#[derive(Clone, Debug)]
pub struct MarketSnapshot {
    quote: Coin,
    balances: FxHashMap<Coin, f64>,
    markets: FxHashMap<Coin, MarketInfo>,
}

impl MarketSnapshot {
    /// Build a snapshot from raw data, dropping balances at or below `dust`.
    pub fn new(
        quote: Coin,
        balances: impl IntoIterator<Item = (Coin, f64)>,
        markets: impl IntoIterator<Item = (Coin, MarketInfo)>,
        dust: f64,
    ) -> Self {
        Self {
            quote,
            balances: balances
                .into_iter()
                .filter(|(_, amount)| *amount > dust)
                .collect(),
            markets: markets.into_iter().collect(),
        }
    }

    /// Read balances and markets from the exchange.
    pub fn fetch<E: Exchange + ?Sized>(exchange: &E, quote: Coin, dust: f64) -> Result<Self> {
        let balances = exchange.balances()?;
        let markets = exchange.markets()?;
        log::debug!(
            "snapshot: {} balances, {} markets",
            balances.len(),
            markets.len()
        );
        Ok(Self::new(quote, balances, markets, dust))
    }

    pub fn quote(&self) -> Coin {
        self.quote
    }

    /// Held amount of `coin` (zero if not held or dust).
    pub fn balance(&self, coin: &Coin) -> f64 {
        self.balances.get(coin).copied().unwrap_or(0.0)
    }

    /// Held coins in ascending order.
    pub fn held_coins(&self) -> Vec<Coin> {
        let mut coins: Vec<Coin> = self.balances.keys().copied().collect();
        coins.sort();
        coins
    }

    pub fn market(&self, coin: &Coin) -> Option<&MarketInfo> {
        self.markets.get(coin)
    }

    /// Mid price of `coin` in quote currency. The quote coin itself is 1.0.
    pub fn mid_price(&self, coin: &Coin) -> Result<f64> {
        if *coin == self.quote {
            return Ok(1.0);
        }
        let info = self.markets.get(coin).ok_or(Error::MissingMarket(*coin))?;
        let mid = info.mid();
        if !mid.is_finite() || mid <= 0.0 {
            return Err(Error::InvalidMarket(*coin));
        }
        Ok(mid)
    }

    /// Quote-currency value of every held coin.
    pub fn value_map(&self) -> Result<BTreeMap<Coin, f64>> {
        self.balances
            .iter()
            .map(|(coin, amount)| Ok((*coin, amount * self.mid_price(coin)?)))
            .collect()
    }

    /// Total account value in quote currency.
    pub fn total_value(&self) -> Result<f64> {
        Ok(self.value_map()?.values().sum())
    }
}
