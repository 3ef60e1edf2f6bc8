//! Execution orchestrator: cancel → snapshot → plan → confirm → execute.
//!
//! This is the main workflow that ties together all components.

use coinbalance::{Coin, Exchange, ExecutionReport, MarketSnapshot, OrderTracker, Plan, Planner};
use log::{info, warn};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::gateway;
use crate::target::TargetSpec;

/// Options for a rebalance run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub force: bool,
    /// Where the targets came from (file path or "command line"), for the audit trail.
    pub target_source: String,
}

/// Outcome of a rebalance run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub plan: Plan,
    /// `None` when nothing was executed (empty plan, dry run, declined).
    pub report: Option<ExecutionReport>,
    pub total_value: f64,
}

impl RunSummary {
    /// True if some order had to be force-cancelled at the timeout.
    pub fn had_incomplete(&self) -> bool {
        self.report.as_ref().is_some_and(|r| r.had_incomplete)
    }
}

/// One held coin and its value in the quote currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Holding {
    pub coin: Coin,
    pub amount: f64,
    /// `None` when the coin has no usable market against the quote.
    pub value: Option<f64>,
}

/// Execute a full rebalance run against Poloniex.
pub fn run(config: &Config, target: &TargetSpec, opts: &RunOptions) -> Result<RunSummary> {
    let exchange = gateway::connect_poloniex(config)?;
    let mut audit = AuditLog::open(&config.audit_path())?;
    run_with(exchange.as_ref(), config, target, opts, &mut audit)
}

/// Execute a full rebalance run against any exchange.
pub fn run_with<E: Exchange + ?Sized>(
    exchange: &E,
    config: &Config,
    target: &TargetSpec,
    opts: &RunOptions,
    audit: &mut AuditLog,
) -> Result<RunSummary> {
    let quote = config.quote();
    let threshold = config.rebalance.threshold;
    let weights = target.weights()?;
    audit::log_run_started(audit, &opts.target_source, &weights, threshold, opts.dry_run)?;

    // 1. Stale orders would lock funds and skew the snapshot
    let tracker = OrderTracker::new(exchange).with_poll_interval(config.poll_interval());
    if opts.dry_run {
        info!("Dry run: open orders left in place, balances may exclude funds they lock");
    } else {
        tracker.cancel_outstanding()?;
    }

    // 2. Snapshot balances and prices
    let snapshot = MarketSnapshot::fetch(exchange, quote, config.rebalance.dust)?;
    let holdings = holdings(&snapshot);
    let total = total_value(&holdings);
    display_balances(&holdings, total, quote);
    audit::log_balances(audit, &holdings, total)?;
    if !opts.dry_run {
        audit::record_balance(&config.balance_path(), total)?;
    }

    // 3. Plan
    let plan = Planner::new(weights).plan(&snapshot, threshold)?;
    audit::log_plan(audit, &plan)?;

    let mut summary = RunSummary {
        plan,
        report: None,
        total_value: total,
    };

    if summary.plan.is_empty() {
        println!(
            "\nNo rebalancing needed: every coin is within {:.1}% of target.",
            threshold * 100.0
        );
        audit.log_simple("no_rebalance_needed")?;
        return Ok(summary);
    }

    display_plan(&summary.plan, quote);
    if !summary.plan.completed {
        warn!("Not enough {quote} to fund every buy; run again once the sells have filled");
    }

    // 4. Dry run stops here
    if opts.dry_run {
        println!("\n[DRY RUN] No orders submitted.");
        return Ok(summary);
    }

    // 5. Confirm execution
    if !opts.force {
        let confirmed = confirmation(
            dialoguer::Confirm::new()
                .with_prompt("Execute?")
                .default(false)
                .interact(),
        )?;

        if !confirmed {
            println!("Aborted.");
            audit.log("user_confirmed", serde_json::json!({"approved": false}))?;
            return Ok(summary);
        }

        audit.log("user_confirmed", serde_json::json!({"approved": true}))?;
    }

    // 6. Execute and wait
    println!("\nExecute {} orders...", summary.plan.orders.len());
    let report = tracker.execute_with(&summary.plan.orders, config.order_timeout(), audit)?;
    audit::log_run_completed(audit, &report)?;

    println!(
        "\n{} placed, {} filled, {} cancelled. Audit logged to {}",
        report.placed.len(),
        report.filled.len(),
        report.cancelled.len(),
        config.audit_path().display()
    );
    if report.had_incomplete {
        warn!(
            "{} order(s) did not fill within {} minutes",
            report.cancelled.len(),
            config.rebalance.timeout_minutes
        );
    }

    summary.report = Some(report);
    Ok(summary)
}

/// Print held coins with their quote-currency value.
pub fn show_balances(config: &Config) -> Result<()> {
    let exchange = gateway::connect_poloniex(config)?;
    let snapshot =
        MarketSnapshot::fetch(exchange.as_ref(), config.quote(), config.rebalance.dust)?;
    let holdings = holdings(&snapshot);
    display_balances(&holdings, total_value(&holdings), config.quote());
    Ok(())
}

/// Check that the public and private endpoints answer.
pub fn check_status(config: &Config) -> Result<()> {
    print!("Connecting to {}... ", config.exchange.public_url);
    let exchange = gateway::connect_poloniex(config)?;
    let markets = exchange.markets()?;
    println!("OK ({} {} markets)", markets.len(), config.rebalance.quote);

    print!("Authenticating at {}... ", config.exchange.trading_url);
    let balances = exchange.balances()?;
    let held = balances.values().filter(|a| **a > config.rebalance.dust).count();
    println!("OK ({held} coins held)");
    Ok(())
}

/// Cancel every open order on the account.
pub fn cancel_all(config: &Config) -> Result<()> {
    let exchange = gateway::connect_poloniex(config)?;
    OrderTracker::new(exchange.as_ref()).cancel_outstanding()?;
    println!("All open orders cancelled.");
    Ok(())
}

// === Helpers ===

/// A prompt that cannot be shown (no terminal) is an error, not a "no".
fn confirmation(answer: std::result::Result<bool, dialoguer::Error>) -> Result<bool> {
    answer.map_err(|e| Error::Confirmation(e.to_string()))
}

/// Held coins in symbol order, valued at mid price.
pub fn holdings(snapshot: &MarketSnapshot) -> Vec<Holding> {
    snapshot
        .held_coins()
        .into_iter()
        .map(|coin| {
            let amount = snapshot.balance(&coin);
            let value = match snapshot.mid_price(&coin) {
                Ok(price) => Some(amount * price),
                Err(e) => {
                    info!("Cannot value {coin}: {e}");
                    None
                }
            };
            Holding {
                coin,
                amount,
                value,
            }
        })
        .collect()
}

/// Sum of the valued holdings.
pub fn total_value(holdings: &[Holding]) -> f64 {
    holdings.iter().filter_map(|h| h.value).sum()
}

fn display_balances(holdings: &[Holding], total: f64, quote: Coin) {
    if holdings.is_empty() {
        println!("No balances.");
        return;
    }

    println!("BALANCES:");
    for h in holdings {
        match h.value {
            Some(value) => println!(
                "  {:8} {:>18.8}  ({:>12.8} {quote})",
                h.coin, h.amount, value
            ),
            None => println!("  {:8} {:>18.8}  (no {quote} market)", h.coin, h.amount),
        }
    }
    println!("  Total: {total:.8} {quote}");
}

fn display_plan(plan: &Plan, quote: Coin) {
    println!("\nREBALANCE ORDERS:");
    println!(
        "  {:>3}  {:6} {:8} {:>18} {:>14} {:>14}",
        "#", "Action", "Coin", "Amount", "Price", "Notional"
    );

    for (i, order) in plan.orders.iter().enumerate() {
        println!(
            "  {:>3}  {:6} {:8} {:>18.8} {:>14.8} {:>14.8}",
            i + 1,
            order.action,
            order.coin,
            order.amount,
            order.price,
            order.notional(),
        );
    }

    println!("\nBuys need {:.8} {quote}", plan.buy_notional());
}
