//! Exchange gateways for coinbalance.
//!
//! Each gateway implements [`coinbalance::Exchange`] so the planner and the
//! order tracker can run against a live account.
//!
//! - **Poloniex** (feature `poloniex`): BTC-quoted spot markets through the
//!   public `returnTicker` endpoint and the signed trading API.

#[cfg(feature = "poloniex")]
pub mod poloniex;

#[cfg(feature = "poloniex")]
pub use poloniex::PoloniexExchange;

pub use coinbalance::{Exchange, ExchangeError, ExchangeResult};
