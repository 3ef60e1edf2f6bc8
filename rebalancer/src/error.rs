//! Error types for the rebalancer.

use std::path::PathBuf;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("target error: {0}")]
    Target(String),

    #[error("failed to read target file {path}: {source}")]
    TargetRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse target JSON: {0}")]
    TargetParse(#[from] serde_json::Error),

    #[error(transparent)]
    Rebalance(#[from] coinbalance::Error),

    #[error("cannot ask for confirmation ({0}); pass --force to run unattended")]
    Confirmation(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

impl From<coinbalance::ExchangeError> for Error {
    fn from(e: coinbalance::ExchangeError) -> Self {
        Error::Rebalance(e.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
