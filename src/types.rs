//! Core types: Action, MarketInfo, TradeIntent, OrderId, PendingOrder

use std::fmt;

use crate::coin::Coin;

/// Trade direction against the quote currency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// Lowercase wire name (`buy` / `sell`), as most exchange APIs spell it.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => f.pad("BUY"),
            Action::Sell => f.pad("SELL"),
        }
    }
}

/// Top-of-book and last trade for one coin, priced in the quote currency.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarketInfo {
    pub best_bid: f64,
    pub best_ask: f64,
    pub last_trade: f64,
}

impl MarketInfo {
    pub fn new(best_bid: f64, best_ask: f64, last_trade: f64) -> Self {
        Self {
            best_bid,
            best_ask,
            last_trade,
        }
    }

    /// Midpoint of best bid and best ask.
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.best_bid + self.best_ask) / 2.0
    }
}

/// A planned, not yet submitted trade. Never mutated after creation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeIntent {
    pub coin: Coin,
    pub action: Action,
    /// Limit price in quote currency per coin.
    pub price: f64,
    /// Amount in native coin units.
    pub amount: f64,
}

impl TradeIntent {
    /// Quote-currency value of the trade (`price * amount`).
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.amount
    }
}

impl fmt::Display for TradeIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.8} {} @ {:.8}",
            self.action, self.amount, self.coin, self.price
        )
    }
}

/// Opaque order identifier assigned by the exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A submitted order not yet confirmed closed by the exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingOrder {
    pub id: OrderId,
    pub coin: Coin,
}
