//! Poloniex REST API client.
//!
//! Public data comes from `GET <public>?command=...`. Private commands are
//! form-encoded `POST <trading>` bodies starting with a strictly increasing
//! `nonce`, signed with the account secret.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use coinbalance::{ExchangeError, ExchangeResult};
use log::debug;
use reqwest::blocking::Client;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use super::auth;
use super::types::{AllOpenOrders, Balances, CancelResponse, OpenOrder, OrderResponse, Ticker};

pub const DEFAULT_PUBLIC_URL: &str = "https://poloniex.com/public";
pub const DEFAULT_TRADING_URL: &str = "https://poloniex.com/tradingApi";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking Poloniex REST client.
pub struct PoloniexClient {
    client: Client,
    api_key: String,
    secret: Zeroizing<String>,
    public_url: String,
    trading_url: String,
    nonce: AtomicU64,
}

impl PoloniexClient {
    /// Create a client against the production endpoints.
    pub fn new(api_key: &str, secret: &str, timeout: Duration) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::Connection(format!("http client setup failed: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            secret: Zeroizing::new(secret.to_string()),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            trading_url: DEFAULT_TRADING_URL.to_string(),
            nonce: AtomicU64::new(initial_nonce()),
        })
    }

    /// Point the client at other endpoints (mirrors, test servers).
    pub fn with_endpoints(mut self, public_url: &str, trading_url: &str) -> Self {
        self.public_url = public_url.to_string();
        self.trading_url = trading_url.to_string();
        self
    }

    /// All tickers (GET `returnTicker`), keyed by pair name.
    pub fn return_ticker(&self) -> ExchangeResult<FxHashMap<String, Ticker>> {
        let url = format!("{}?command=returnTicker", self.public_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| ExchangeError::Connection(format!("ticker request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            return Err(ExchangeError::Connection(format!(
                "ticker returned {status}: {body}"
            )));
        }

        let body = resp
            .text()
            .map_err(|e| ExchangeError::Connection(format!("failed to read ticker: {e}")))?;
        parse_response(&body)
    }

    /// Available balance of every currency on the account.
    pub fn return_balances(&self) -> ExchangeResult<Balances> {
        self.private_call("returnBalances", &[])
    }

    /// Place a limit order. `command` is `"buy"` or `"sell"`.
    pub fn place_limit(
        &self,
        command: &str,
        pair: &str,
        rate: f64,
        amount: f64,
    ) -> ExchangeResult<OrderResponse> {
        let rate = format_decimal(rate);
        let amount = format_decimal(amount);
        self.private_call(
            command,
            &[("currencyPair", pair), ("rate", &rate), ("amount", &amount)],
        )
    }

    /// Open orders for one pair.
    pub fn return_open_orders(&self, pair: &str) -> ExchangeResult<Vec<OpenOrder>> {
        self.private_call("returnOpenOrders", &[("currencyPair", pair)])
    }

    /// Open orders for every pair.
    pub fn return_all_open_orders(&self) -> ExchangeResult<AllOpenOrders> {
        self.private_call("returnOpenOrders", &[("currencyPair", "all")])
    }

    /// Cancel one order. The pair is optional on the exchange side.
    pub fn cancel_order(
        &self,
        pair: Option<&str>,
        order_number: u64,
    ) -> ExchangeResult<CancelResponse> {
        let number = order_number.to_string();
        match pair {
            Some(pair) => self.private_call(
                "cancelOrder",
                &[("currencyPair", pair), ("orderNumber", &number)],
            ),
            None => self.private_call("cancelOrder", &[("orderNumber", &number)]),
        }
    }

    fn next_nonce(&self) -> u64 {
        self.nonce.fetch_add(1, Ordering::SeqCst)
    }

    /// Signed POST to the trading endpoint.
    fn private_call<T: DeserializeOwned>(
        &self,
        command: &str,
        params: &[(&str, &str)],
    ) -> ExchangeResult<T> {
        let body = post_body(self.next_nonce(), command, params);
        let signature = auth::sign(&body, &self.secret);

        debug!("Poloniex {command}: {body}");

        let resp = self
            .client
            .post(&self.trading_url)
            .header("Key", &self.api_key)
            .header("Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .map_err(|e| ExchangeError::Connection(format!("{command} request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| ExchangeError::Connection(format!("failed to read {command}: {e}")))?;

        // Rejections come back as {"error": "..."}, sometimes with a non-2xx status.
        match parse_response(&text) {
            Err(ExchangeError::Parse(_)) if !status.is_success() => Err(
                ExchangeError::Connection(format!("{command} returned {status}: {text}")),
            ),
            other => other,
        }
    }
}

/// Build a private request body: `nonce=N&command=C&k=v...`.
pub fn post_body(nonce: u64, command: &str, params: &[(&str, &str)]) -> String {
    let mut body = format!("nonce={nonce}&command={command}");
    for (key, value) in params {
        body.push('&');
        body.push_str(key);
        body.push('=');
        body.push_str(value);
    }
    body
}

/// Decode a response body, turning an `"error"` field into a rejection.
pub fn parse_response<T: DeserializeOwned>(body: &str) -> ExchangeResult<T> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ExchangeError::Parse(format!("invalid JSON ({e}): {body}")))?;

    if let Some(err) = value.get("error") {
        let text = err.as_str().map_or_else(|| err.to_string(), str::to_string);
        return Err(ExchangeError::Rejected(text));
    }

    serde_json::from_value(value).map_err(|e| ExchangeError::Parse(e.to_string()))
}

/// Price/amount with the exchange's 8-decimal precision.
pub fn format_decimal(value: f64) -> String {
    format!("{value:.8}")
}

/// Nonces must increase across runs, so start from wall-clock microseconds.
fn initial_nonce() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_micros() as u64
}
