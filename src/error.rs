//! Error types for planning and order execution.

use crate::coin::Coin;

/// Errors raised by an [`Exchange`](crate::Exchange) implementation.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("connection error: {0}")]
    Connection(String),

    /// The exchange refused the request; carries the exchange's own error text.
    #[error("exchange rejected request: {0}")]
    Rejected(String),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("unknown coin: {0}")]
    UnknownCoin(String),

    #[error("{0}")]
    Other(String),
}

/// Errors that abort a rebalance run before or during order placement.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Mismatched or degenerate caller input.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no market for {0}")]
    MissingMarket(Coin),

    #[error("market for {0} has no usable mid price")]
    InvalidMarket(Coin),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

pub type Result<T> = std::result::Result<T, Error>;
