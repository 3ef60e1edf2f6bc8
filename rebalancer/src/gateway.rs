//! Exchange connection used by rebalancer execution.

use coinbalance::Exchange;
use coinbalance_gateway::PoloniexExchange;
use coinbalance_gateway::poloniex::client::PoloniexClient;
use log::info;

use crate::config::Config;
use crate::error::Result;

/// Build the Poloniex gateway from the rebalancer config.
pub fn connect_poloniex(config: &Config) -> Result<Box<dyn Exchange>> {
    config.require_credentials()?;
    let client = PoloniexClient::new(
        &config.exchange.api_key,
        &config.exchange.api_secret,
        config.request_timeout(),
    )?
    .with_endpoints(&config.exchange.public_url, &config.exchange.trading_url);

    info!(
        "Using Poloniex at {} ({} markets)",
        config.exchange.trading_url, config.rebalance.quote
    );
    Ok(Box::new(PoloniexExchange::with_client(client, config.quote())))
}
