//! Exchange capability trait consumed by the snapshot and the order tracker.

use rustc_hash::FxHashMap;

use crate::coin::Coin;
use crate::error::ExchangeError;
use crate::types::{MarketInfo, OrderId, TradeIntent};

pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;

/// The primitive operations the rebalancer needs from an exchange.
///
/// All methods take `&self`: implementations own whatever mutable state they
/// need (nonce counters, caches) behind interior mutability.
pub trait Exchange {
    /// Raw account balances in native units. Zero and dust entries may be present.
    fn balances(&self) -> ExchangeResult<FxHashMap<Coin, f64>>;

    /// Best bid/ask and last trade for every coin quoted in the quote currency.
    fn markets(&self) -> ExchangeResult<FxHashMap<Coin, MarketInfo>>;

    /// Place a limit order. Returns the exchange-assigned id.
    fn place_order(&self, intent: &TradeIntent) -> ExchangeResult<OrderId>;

    /// Whether `id` still appears among the open orders for `coin`.
    fn is_order_open(&self, id: OrderId, coin: Coin) -> ExchangeResult<bool>;

    /// Cancel one order. Succeeds if the order is already gone.
    fn cancel_order(&self, id: OrderId) -> ExchangeResult<()>;

    /// Cancel every open order on the account.
    fn cancel_all_orders(&self) -> ExchangeResult<()>;
}

impl<E: Exchange + ?Sized> Exchange for &E {
    fn balances(&self) -> ExchangeResult<FxHashMap<Coin, f64>> {
        (**self).balances()
    }

    fn markets(&self) -> ExchangeResult<FxHashMap<Coin, MarketInfo>> {
        (**self).markets()
    }

    fn place_order(&self, intent: &TradeIntent) -> ExchangeResult<OrderId> {
        (**self).place_order(intent)
    }

    fn is_order_open(&self, id: OrderId, coin: Coin) -> ExchangeResult<bool> {
        (**self).is_order_open(id, coin)
    }

    fn cancel_order(&self, id: OrderId) -> ExchangeResult<()> {
        (**self).cancel_order(id)
    }

    fn cancel_all_orders(&self) -> ExchangeResult<()> {
        (**self).cancel_all_orders()
    }
}

impl<E: Exchange + ?Sized> Exchange for Box<E> {
    fn balances(&self) -> ExchangeResult<FxHashMap<Coin, f64>> {
        (**self).balances()
    }

    fn markets(&self) -> ExchangeResult<FxHashMap<Coin, MarketInfo>> {
        (**self).markets()
    }

    fn place_order(&self, intent: &TradeIntent) -> ExchangeResult<OrderId> {
        (**self).place_order(intent)
    }

    fn is_order_open(&self, id: OrderId, coin: Coin) -> ExchangeResult<bool> {
        (**self).is_order_open(id, coin)
    }

    fn cancel_order(&self, id: OrderId) -> ExchangeResult<()> {
        (**self).cancel_order(id)
    }

    fn cancel_all_orders(&self) -> ExchangeResult<()> {
        (**self).cancel_all_orders()
    }
}
