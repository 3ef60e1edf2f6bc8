//! Poloniex API response types.
//!
//! The legacy API sends most numbers as JSON strings ("0.00470002") but a
//! few fields as bare numbers, so numeric fields accept either.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer};

/// A number that arrives either as a JSON number or as a decimal string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

fn de_f64<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    match Numeric::deserialize(de)? {
        Numeric::Number(n) => Ok(n),
        Numeric::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn de_u64<'de, D: Deserializer<'de>>(de: D) -> Result<u64, D::Error> {
    match Numeric::deserialize(de)? {
        Numeric::Number(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as u64),
        Numeric::Number(n) => Err(serde::de::Error::custom(format!(
            "invalid order number {n}"
        ))),
        Numeric::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// One entry of `returnTicker`, keyed by pair name (e.g. `BTC_ETH`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    #[serde(deserialize_with = "de_f64")]
    pub last: f64,
    #[serde(deserialize_with = "de_f64")]
    pub highest_bid: f64,
    #[serde(deserialize_with = "de_f64")]
    pub lowest_ask: f64,
    #[serde(default)]
    pub is_frozen: Option<String>,
}

impl Ticker {
    /// Frozen markets accept no orders.
    pub fn frozen(&self) -> bool {
        self.is_frozen.as_deref() == Some("1")
    }
}

/// A single balance value from `returnBalances`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(transparent)]
pub struct Balance(#[serde(deserialize_with = "de_f64")] pub f64);

/// `returnBalances` response: currency symbol to available amount.
pub type Balances = FxHashMap<String, Balance>;

/// Response to a `buy` or `sell` command.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(deserialize_with = "de_u64")]
    pub order_number: u64,
    #[serde(default)]
    pub resulting_trades: Vec<serde_json::Value>,
}

/// An open order from `returnOpenOrders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    #[serde(deserialize_with = "de_u64")]
    pub order_number: u64,
    #[serde(rename = "type")]
    pub side: String,
    #[serde(deserialize_with = "de_f64")]
    pub rate: f64,
    #[serde(deserialize_with = "de_f64")]
    pub amount: f64,
}

/// `returnOpenOrders` with `currencyPair=all`: pair name to its open orders.
pub type AllOpenOrders = FxHashMap<String, Vec<OpenOrder>>;

/// Response to `cancelOrder`.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelResponse {
    /// `1` on success.
    #[serde(default)]
    pub success: u8,
    #[serde(default)]
    pub message: Option<String>,
}

impl CancelResponse {
    pub fn succeeded(&self) -> bool {
        self.success == 1
    }
}
