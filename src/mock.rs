//! Mock exchange for testing. Implements [`Exchange`] with configurable behavior.
//!
//! Use this in tests to drive the planner and the order tracker without
//! network calls.
//!
//! ```
//! use coinbalance::mock::{FillMode, MockExchange};
//! use coinbalance::Coin;
//!
//! let exchange = MockExchange::builder()
//!     .fill_mode(FillMode::AfterChecks(2))
//!     .with_balance(Coin::new("BTC"), 0.5)
//!     .with_market(Coin::new("BBR"), 0.076, 0.078)
//!     .build();
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;

use crate::coin::Coin;
use crate::error::ExchangeError;
use crate::exchange::{Exchange, ExchangeResult};
use crate::types::{MarketInfo, OrderId, TradeIntent};

/// How long placed orders stay open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillMode {
    /// Gone at the first status check.
    Immediate,
    /// Open for this many status checks, gone at the next one.
    AfterChecks(u32),
    /// Never leave the open list unless cancelled.
    Never,
}

/// Builder for [`MockExchange`].
pub struct MockExchangeBuilder {
    fill_mode: FillMode,
    balances: FxHashMap<Coin, f64>,
    markets: FxHashMap<Coin, MarketInfo>,
    reject_from: Option<usize>,
    fail_status: bool,
    fail_cancel: bool,
}

impl MockExchangeBuilder {
    pub fn fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    pub fn with_balance(mut self, coin: Coin, amount: f64) -> Self {
        self.balances.insert(coin, amount);
        self
    }

    /// Add a market; last trade is set to the bid.
    pub fn with_market(mut self, coin: Coin, bid: f64, ask: f64) -> Self {
        self.markets.insert(coin, MarketInfo::new(bid, ask, bid));
        self
    }

    /// Reject the `n`-th placement (0-based) and every one after it.
    pub fn reject_placements_from(mut self, n: usize) -> Self {
        self.reject_from = Some(n);
        self
    }

    /// Make every `is_order_open` query fail.
    pub fn fail_status_checks(mut self) -> Self {
        self.fail_status = true;
        self
    }

    /// Make every single-order cancel fail.
    pub fn fail_cancels(mut self) -> Self {
        self.fail_cancel = true;
        self
    }

    pub fn build(self) -> MockExchange {
        MockExchange {
            fill_mode: self.fill_mode,
            balances: self.balances,
            markets: self.markets,
            reject_from: self.reject_from,
            fail_status: self.fail_status,
            fail_cancel: self.fail_cancel,
            state: Mutex::new(MockState::default()),
        }
    }
}

#[derive(Default)]
struct MockState {
    next_id: u64,
    /// Open orders with the number of status checks left before they fill.
    open: Vec<(OrderId, Coin, u32)>,
    placed: Vec<(OrderId, TradeIntent)>,
    cancelled: Vec<OrderId>,
    cancel_all_calls: usize,
    status_checks: usize,
}

/// An in-memory exchange that records every call for assertions.
pub struct MockExchange {
    fill_mode: FillMode,
    balances: FxHashMap<Coin, f64>,
    markets: FxHashMap<Coin, MarketInfo>,
    reject_from: Option<usize>,
    fail_status: bool,
    fail_cancel: bool,
    state: Mutex<MockState>,
}

impl MockExchange {
    pub fn builder() -> MockExchangeBuilder {
        MockExchangeBuilder {
            fill_mode: FillMode::Immediate,
            balances: FxHashMap::default(),
            markets: FxHashMap::default(),
            reject_from: None,
            fail_status: false,
            fail_cancel: false,
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every accepted placement, in submission order.
    pub fn placed_orders(&self) -> Vec<(OrderId, TradeIntent)> {
        self.state().placed.clone()
    }

    /// Ids passed to `cancel_order`, in call order.
    pub fn cancelled_orders(&self) -> Vec<OrderId> {
        self.state().cancelled.clone()
    }

    pub fn cancel_all_calls(&self) -> usize {
        self.state().cancel_all_calls
    }

    pub fn status_checks(&self) -> usize {
        self.state().status_checks
    }

    /// Ids still open on the mock book.
    pub fn open_orders(&self) -> Vec<OrderId> {
        self.state().open.iter().map(|(id, _, _)| *id).collect()
    }
}

impl Exchange for MockExchange {
    fn balances(&self) -> ExchangeResult<FxHashMap<Coin, f64>> {
        Ok(self.balances.clone())
    }

    fn markets(&self) -> ExchangeResult<FxHashMap<Coin, MarketInfo>> {
        Ok(self.markets.clone())
    }

    fn place_order(&self, intent: &TradeIntent) -> ExchangeResult<OrderId> {
        let mut state = self.state();
        let attempt = state.placed.len();
        if self.reject_from.is_some_and(|n| attempt >= n) {
            return Err(ExchangeError::Rejected(format!(
                "mock: {} order for {} rejected",
                intent.action.as_str(),
                intent.coin
            )));
        }

        state.next_id += 1;
        let id = OrderId(state.next_id);
        let checks = match self.fill_mode {
            FillMode::Immediate => 0,
            FillMode::AfterChecks(n) => n,
            FillMode::Never => u32::MAX,
        };
        state.open.push((id, intent.coin, checks));
        state.placed.push((id, intent.clone()));
        Ok(id)
    }

    fn is_order_open(&self, id: OrderId, coin: Coin) -> ExchangeResult<bool> {
        let mut state = self.state();
        state.status_checks += 1;
        if self.fail_status {
            return Err(ExchangeError::Connection("mock: status unavailable".into()));
        }

        let never = self.fill_mode == FillMode::Never;
        let Some(idx) = state
            .open
            .iter()
            .position(|(oid, c, _)| *oid == id && *c == coin)
        else {
            return Ok(false);
        };
        if never {
            return Ok(true);
        }
        let left = state.open[idx].2;
        if left == 0 {
            state.open.remove(idx);
            return Ok(false);
        }
        state.open[idx].2 = left - 1;
        Ok(true)
    }

    fn cancel_order(&self, id: OrderId) -> ExchangeResult<()> {
        let mut state = self.state();
        state.cancelled.push(id);
        if self.fail_cancel {
            return Err(ExchangeError::Rejected(format!("mock: cannot cancel {id}")));
        }
        state.open.retain(|(oid, _, _)| *oid != id);
        Ok(())
    }

    fn cancel_all_orders(&self) -> ExchangeResult<()> {
        let mut state = self.state();
        state.cancel_all_calls += 1;
        state.open.clear();
        Ok(())
    }
}
