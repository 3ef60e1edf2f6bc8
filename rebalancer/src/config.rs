//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use coinbalance::Coin;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Environment variable overriding `exchange.api_key`.
pub const API_KEY_ENV: &str = "POLONIEX_API_KEY";
/// Environment variable overriding `exchange.api_secret`.
pub const API_SECRET_ENV: &str = "POLONIEX_API_SECRET";

/// Upper bound on the order timeout: one week.
pub const MAX_TIMEOUT_MINUTES: u64 = 7 * 24 * 60;

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub rebalance: RebalanceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_public_url")]
    pub public_url: String,
    #[serde(default = "default_trading_url")]
    pub trading_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_public_url() -> String {
    "https://poloniex.com/public".into()
}
fn default_trading_url() -> String {
    "https://poloniex.com/tradingApi".into()
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            public_url: default_public_url(),
            trading_url: default_trading_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RebalanceConfig {
    #[serde(default = "default_quote")]
    pub quote: String,
    /// Fractional deviation from target that triggers an order (0.1 = 10%).
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_dust")]
    pub dust: f64,
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_quote() -> String {
    "BTC".into()
}
fn default_threshold() -> f64 {
    0.1
}
fn default_dust() -> f64 {
    coinbalance::DEFAULT_DUST
}
fn default_timeout_minutes() -> u64 {
    60
}
fn default_poll_interval() -> u64 {
    30
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            quote: default_quote(),
            threshold: default_threshold(),
            dust: default_dust(),
            timeout_minutes: default_timeout_minutes(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
    #[serde(default = "default_balance_file")]
    pub balance_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}
fn default_balance_file() -> String {
    "balances.csv".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
            balance_file: default_balance_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace API credentials with the ones found in the environment.
    pub fn apply_env(&mut self) {
        self.apply_credentials(
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(API_SECRET_ENV).ok(),
        );
    }

    fn apply_credentials(&mut self, key: Option<String>, secret: Option<String>) {
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            self.exchange.api_key = key;
        }
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            self.exchange.api_secret = secret;
        }
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        if Coin::try_new(&self.rebalance.quote).is_none() {
            return Err(Error::Config(format!(
                "invalid quote coin '{}'",
                self.rebalance.quote
            )));
        }
        if !self.rebalance.threshold.is_finite() || self.rebalance.threshold < 0.0 {
            return Err(Error::Config("threshold must be >= 0".into()));
        }
        if !self.rebalance.dust.is_finite() || self.rebalance.dust < 0.0 {
            return Err(Error::Config("dust must be >= 0".into()));
        }
        if self.rebalance.timeout_minutes > MAX_TIMEOUT_MINUTES {
            return Err(Error::Config(format!(
                "timeout_minutes must be <= {MAX_TIMEOUT_MINUTES}, got {}",
                self.rebalance.timeout_minutes
            )));
        }
        if self.rebalance.poll_interval_secs == 0 {
            return Err(Error::Config("poll_interval_secs must be > 0".into()));
        }
        if self.exchange.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    /// Fail unless both API credentials are set.
    pub fn require_credentials(&self) -> Result<()> {
        if self.exchange.api_key.is_empty() || self.exchange.api_secret.is_empty() {
            return Err(Error::Config(format!(
                "API credentials missing: set [exchange] api_key/api_secret \
                 or {API_KEY_ENV}/{API_SECRET_ENV}"
            )));
        }
        Ok(())
    }

    pub fn quote(&self) -> Coin {
        Coin::try_new(&self.rebalance.quote).unwrap_or_else(|| Coin::new("BTC"))
    }

    pub fn order_timeout(&self) -> Duration {
        Duration::from_secs(self.rebalance.timeout_minutes.saturating_mul(60))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.rebalance.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange.request_timeout_secs)
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    /// Full path to the balance history file.
    pub fn balance_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.balance_file)
    }
}
