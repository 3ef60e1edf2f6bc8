//! Poloniex spot gateway.

pub mod auth;
pub mod client;
pub mod types;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use coinbalance::{Coin, Exchange, ExchangeError, ExchangeResult, MarketInfo, OrderId, TradeIntent};
use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use client::PoloniexClient;
use types::{Balances, CancelResponse, Ticker};

/// Text Poloniex returns when cancelling an order that is already gone.
const ORDER_GONE: &str = "Invalid order number";

/// Poloniex gateway implementing [`Exchange`] for `<quote>_<coin>` markets.
///
/// Tickers and balances are fetched once and cached for the lifetime of
/// the gateway; call [`refresh`](Self::refresh) to drop the caches.
pub struct PoloniexExchange {
    client: PoloniexClient,
    quote: Coin,
    markets: Mutex<Option<FxHashMap<Coin, MarketInfo>>>,
    balances: Mutex<Option<FxHashMap<Coin, f64>>>,
    /// Coin of every order placed through this gateway, for pair-scoped calls.
    orders: Mutex<FxHashMap<OrderId, Coin>>,
}

impl PoloniexExchange {
    /// Create a gateway quoting in BTC.
    pub fn new(api_key: &str, secret: &str, timeout: Duration) -> ExchangeResult<Self> {
        Ok(Self::with_client(
            PoloniexClient::new(api_key, secret, timeout)?,
            Coin::new("BTC"),
        ))
    }

    pub fn with_client(client: PoloniexClient, quote: Coin) -> Self {
        Self {
            client,
            quote,
            markets: Mutex::new(None),
            balances: Mutex::new(None),
            orders: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn quote(&self) -> Coin {
        self.quote
    }

    pub fn client(&self) -> &PoloniexClient {
        &self.client
    }

    /// Forget cached tickers and balances.
    pub fn refresh(&self) {
        *lock(&self.markets) = None;
        *lock(&self.balances) = None;
    }

    /// Exchange pair name for `coin`, e.g. `BTC_ETH`.
    pub fn pair(&self, coin: Coin) -> String {
        format!("{}_{}", self.quote, coin)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keep the `<quote>_*` pairs of a ticker response, keyed by the base coin.
///
/// Frozen markets and symbols that do not fit a [`Coin`] are skipped.
pub fn quote_markets(
    tickers: &FxHashMap<String, Ticker>,
    quote: Coin,
) -> FxHashMap<Coin, MarketInfo> {
    let prefix = format!("{quote}_");
    tickers
        .iter()
        .filter_map(|(pair, t)| {
            let base = pair.strip_prefix(&prefix)?;
            if t.frozen() {
                debug!("Skipping frozen market {pair}");
                return None;
            }
            let Some(coin) = Coin::try_new(base) else {
                debug!("Skipping market with unsupported symbol {pair}");
                return None;
            };
            Some((coin, MarketInfo::new(t.highest_bid, t.lowest_ask, t.last)))
        })
        .collect()
}

/// Convert a `returnBalances` response into coin amounts.
pub fn coin_balances(raw: &Balances) -> FxHashMap<Coin, f64> {
    raw.iter()
        .filter_map(|(symbol, amount)| match Coin::try_new(symbol) {
            Some(coin) => Some((coin, amount.0)),
            None => {
                debug!("Skipping balance with unsupported symbol {symbol}");
                None
            }
        })
        .collect()
}

/// Interpret a `cancelOrder` reply: `Ok(true)` if cancelled, `Ok(false)`
/// if the order was already gone, and an error if the exchange refused or
/// did not acknowledge the cancel.
pub fn cancel_outcome(
    order_number: u64,
    result: ExchangeResult<CancelResponse>,
) -> ExchangeResult<bool> {
    match result {
        Ok(resp) if resp.succeeded() => Ok(true),
        Ok(resp) => Err(ExchangeError::Rejected(resp.message.unwrap_or_else(|| {
            format!("cancel of #{order_number} not acknowledged")
        }))),
        Err(ExchangeError::Rejected(msg)) if msg.starts_with(ORDER_GONE) => {
            debug!("#{order_number} already gone: {msg}");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

impl Exchange for PoloniexExchange {
    fn balances(&self) -> ExchangeResult<FxHashMap<Coin, f64>> {
        let mut cache = lock(&self.balances);
        if let Some(balances) = cache.as_ref() {
            return Ok(balances.clone());
        }
        let balances = coin_balances(&self.client.return_balances()?);
        debug!("Fetched {} balances", balances.len());
        *cache = Some(balances.clone());
        Ok(balances)
    }

    fn markets(&self) -> ExchangeResult<FxHashMap<Coin, MarketInfo>> {
        let mut cache = lock(&self.markets);
        if let Some(markets) = cache.as_ref() {
            return Ok(markets.clone());
        }
        let markets = quote_markets(&self.client.return_ticker()?, self.quote);
        debug!("Fetched {} {} markets", markets.len(), self.quote);
        *cache = Some(markets.clone());
        Ok(markets)
    }

    fn place_order(&self, intent: &TradeIntent) -> ExchangeResult<OrderId> {
        if intent.coin == self.quote {
            return Err(ExchangeError::UnknownCoin(intent.coin.to_string()));
        }
        let resp = self.client.place_limit(
            intent.action.as_str(),
            &self.pair(intent.coin),
            intent.price,
            intent.amount,
        )?;

        let id = OrderId(resp.order_number);
        if !resp.resulting_trades.is_empty() {
            debug!("{id} matched {} trade(s) on entry", resp.resulting_trades.len());
        }
        lock(&self.orders).insert(id, intent.coin);
        Ok(id)
    }

    fn is_order_open(&self, id: OrderId, coin: Coin) -> ExchangeResult<bool> {
        let open = self.client.return_open_orders(&self.pair(coin))?;
        Ok(open.iter().any(|o| o.order_number == id.0))
    }

    fn cancel_order(&self, id: OrderId) -> ExchangeResult<()> {
        let pair = lock(&self.orders).get(&id).map(|c| self.pair(*c));
        cancel_outcome(id.0, self.client.cancel_order(pair.as_deref(), id.0))?;
        Ok(())
    }

    fn cancel_all_orders(&self) -> ExchangeResult<()> {
        let open = self.client.return_all_open_orders()?;
        let mut cancelled = 0usize;
        for (pair, orders) in &open {
            for order in orders {
                info!("Cancelling open order #{} on {pair}", order.order_number);
                let resp = self.client.cancel_order(Some(pair), order.order_number);
                match cancel_outcome(order.order_number, resp) {
                    Ok(true) => cancelled += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Failed to cancel #{} on {pair}: {e}", order.order_number);
                        return Err(e);
                    }
                }
            }
        }
        if cancelled > 0 {
            // Cancelling releases funds, so cached balances are stale.
            *lock(&self.balances) = None;
        }
        debug!("Cancelled {cancelled} open order(s)");
        Ok(())
    }
}
