//! coinbalance-rebalancer: target-weight rebalancer for a Poloniex account.
//!
//! Reads target weights from a JSON file or the command line, cancels stale
//! orders, snapshots balances and BTC markets, plans the corrective orders,
//! and executes them with a timeout, an audit trail, and a balance history.

pub mod audit;
pub mod config;
pub mod error;
pub mod execution;
pub mod gateway;
pub mod target;
