//! # coinbalance
//!
//! Target-weight portfolio rebalancing for a single crypto exchange.
//!
//! Two pieces carry the logic:
//!
//! - [`Planner`]: turns target weights plus a [`MarketSnapshot`] of balances
//!   and best bid/ask into a list of [`TradeIntent`]s, respecting the quote
//!   currency budget for buys.
//! - [`OrderTracker`]: places those intents, polls the exchange until they
//!   fill, and cancels whatever is still open when the timeout expires.
//!
//! Both talk to the outside world only through the [`Exchange`] trait. The
//! [`mock::MockExchange`] implements it in memory for tests; the
//! `coinbalance-gateway` crate implements it for Poloniex.
//!
//! ## Quick Start
//!
//! ```
//! use std::time::Duration;
//! use coinbalance::mock::MockExchange;
//! use coinbalance::{Coin, MarketSnapshot, OrderTracker, Planner, TargetWeights};
//!
//! let btc = Coin::new("BTC");
//! let bbr = Coin::new("BBR");
//! let exchange = MockExchange::builder()
//!     .with_balance(btc, 0.5)
//!     .with_market(bbr, 0.076, 0.078)
//!     .build();
//!
//! let tracker = OrderTracker::new(&exchange);
//! tracker.cancel_outstanding().unwrap();
//!
//! let snapshot = MarketSnapshot::fetch(&exchange, btc, 1e-8).unwrap();
//! let planner = Planner::new(TargetWeights::from_parts(&[bbr, btc], &[1.0, 1.0]).unwrap());
//! let plan = planner.plan(&snapshot, 0.1).unwrap();
//! assert_eq!(plan.orders.len(), 1);
//!
//! let report = tracker.execute(&plan.orders, Duration::from_secs(60)).unwrap();
//! assert!(!report.had_incomplete);
//! ```
//!
//! ## Deviation and threshold
//!
//! | deviation | meaning | action |
//! |-----------|---------|--------|
//! | `> +threshold` | overweight | SELL down to target |
//! | `< -threshold` | underweight | BUY up to target (budget permitting) |
//! | within band | close enough | none |

mod coin;
mod error;
mod exchange;
pub mod mock;
pub mod planner;
mod snapshot;
pub mod tracker;
mod types;
mod weights;

// Re-export public API
pub use coin::{Coin, MAX_COIN_LEN};
pub use error::{Error, ExchangeError, Result};
pub use exchange::{Exchange, ExchangeResult};
pub use planner::{Plan, Planner};
pub use snapshot::{DEFAULT_DUST, MarketSnapshot};
pub use tracker::{DEFAULT_POLL_INTERVAL, ExecutionListener, ExecutionReport, OrderTracker};
pub use types::{Action, MarketInfo, OrderId, PendingOrder, TradeIntent};
pub use weights::TargetWeights;
