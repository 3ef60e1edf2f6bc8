//! Rebalance planner: target weights + market snapshot → trade intents.
//!
//! Every coin is valued in the quote currency at its bid/ask midpoint. A coin's
//! *deviation* is its current portfolio share relative to its target share,
//! minus one: `+0.5` means 50% overweight (sell), `-0.5` means 50% underweight
//! (buy). Coins whose |deviation| reaches the threshold get an order that
//! moves them all the way back to target.
//!
//! BUY orders are paid for with the quote balance held *now*; proceeds of SELL
//! orders in the same plan are not counted, so a BUY that does not fit the
//! remaining budget is dropped and the plan is reported as not completed. A
//! later run, after the sells have filled, picks it up.
//!
//! # Example
//!
//! ```
//! use coinbalance::{Action, Coin, MarketInfo, MarketSnapshot, Planner, TargetWeights};
//!
//! let btc = Coin::new("BTC");
//! let bbr = Coin::new("BBR");
//! let snapshot = MarketSnapshot::new(
//!     btc,
//!     [(btc, 0.5)],
//!     [(bbr, MarketInfo::new(0.076, 0.078, 0.076))],
//!     0.0,
//! );
//! let targets = TargetWeights::from_parts(&[bbr], &[1.0]).unwrap();
//!
//! let plan = Planner::new(targets).plan(&snapshot, 0.1).unwrap();
//! assert!(plan.completed);
//! assert_eq!(plan.orders.len(), 1);
//! assert_eq!(plan.orders[0].action, Action::Buy);
//! assert!((plan.orders[0].price - 0.077).abs() < 1e-12);
//! ```

use std::collections::BTreeMap;

use crate::coin::Coin;
use crate::error::{Error, Result};
use crate::snapshot::MarketSnapshot;
use crate::types::{Action, TradeIntent};
use crate::weights::TargetWeights;

/// Relative slack on budget comparisons, so a BUY spending exactly the
/// remaining quote balance survives floating-point rounding.
const BUDGET_TOLERANCE: f64 = 1e-9;

/// Output of one planning pass.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Plan {
    /// Orders to submit, in ascending coin order.
    pub orders: Vec<TradeIntent>,
    /// False if at least one BUY was dropped because the quote balance ran out.
    pub completed: bool,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Sum of BUY notionals, i.e. quote currency the plan spends.
    pub fn buy_notional(&self) -> f64 {
        self.orders
            .iter()
            .filter(|o| o.action == Action::Buy)
            .map(TradeIntent::notional)
            .sum()
    }
}

/// Per-coin state of one planning pass.
#[derive(Clone, Copy, Debug)]
struct Position {
    coin: Coin,
    current_value: f64,
    target_value: f64,
    deviation: f64,
}

/// Plans rebalancing orders toward a fixed set of target weights.
#[derive(Clone, Debug)]
pub struct Planner {
    targets: TargetWeights,
}

impl Planner {
    pub fn new(targets: TargetWeights) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &TargetWeights {
        &self.targets
    }

    /// Compute the orders that move `snapshot` toward the targets.
    ///
    /// `threshold` is the minimum |deviation| (e.g. `0.1` = 10% off target)
    /// before a coin is traded.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the threshold is invalid, the portfolio is empty,
    ///   or the target weights sum to zero.
    /// - [`Error::MissingMarket`] / [`Error::InvalidMarket`] if a held or
    ///   targeted coin cannot be priced.
    pub fn plan(&self, snapshot: &MarketSnapshot, threshold: f64) -> Result<Plan> {
        plan(&self.targets, snapshot, threshold)
    }
}

/// Free-function form of [`Planner::plan`].
pub fn plan(targets: &TargetWeights, snapshot: &MarketSnapshot, threshold: f64) -> Result<Plan> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(Error::Config(format!(
            "threshold must be finite and non-negative, got {threshold}"
        )));
    }

    let quote = snapshot.quote();
    let current = snapshot.value_map()?;

    let mut universe: Vec<Coin> = targets.coins().chain(current.keys().copied()).collect();
    universe.sort();
    universe.dedup();

    let target_sum: f64 = universe.iter().map(|c| targets.weight(c)).sum();
    let current_sum: f64 = universe.iter().map(|c| value_of(&current, c)).sum();
    if target_sum <= 0.0 {
        return Err(Error::Config("target weights sum to zero".into()));
    }
    if current_sum <= 0.0 {
        return Err(Error::Config("portfolio has no value to rebalance".into()));
    }

    // Every tradable coin must be priceable before any order is planned.
    let mut prices: BTreeMap<Coin, f64> = BTreeMap::new();
    for coin in universe.iter().filter(|c| **c != quote) {
        prices.insert(*coin, snapshot.mid_price(coin)?);
    }

    let mut budget = snapshot.balance(&quote);
    let mut completed = true;
    let mut quote_deviation = 0.0;
    let mut widest: Option<Position> = None;
    let mut crossed = false;
    let mut orders = Vec::new();

    for &coin in &universe {
        let weight = targets.weight(&coin) / target_sum;
        let current_value = value_of(&current, &coin);
        let pos = Position {
            coin,
            current_value,
            target_value: current_sum * weight,
            deviation: deviation(current_value / current_sum, weight),
        };

        if coin == quote {
            quote_deviation = pos.deviation;
            continue;
        }

        if widest.is_none_or(|w| pos.deviation.abs() > w.deviation.abs()) {
            widest = Some(pos);
        }

        if pos.deviation.abs() < threshold {
            continue;
        }
        crossed = true;

        let intent = intent_for(&pos, prices[&coin]);
        if try_spend(&intent, &mut budget) {
            orders.push(intent);
        } else {
            log::debug!(
                "dropping {intent}: needs {:.8} {quote}, {budget:.8} left",
                intent.notional()
            );
            completed = false;
        }
    }

    // Every coin is inside its band but the quote share as a whole is not:
    // correct the coin furthest from target.
    if !crossed && quote_deviation.abs() >= threshold {
        if let Some(pos) = widest {
            let intent = intent_for(&pos, prices[&pos.coin]);
            log::debug!(
                "{quote} deviation {quote_deviation:.4} over threshold, correcting {}",
                pos.coin
            );
            if try_spend(&intent, &mut budget) {
                orders.push(intent);
            } else {
                completed = false;
            }
        }
    }

    Ok(Plan { orders, completed })
}

fn value_of(values: &BTreeMap<Coin, f64>, coin: &Coin) -> f64 {
    values.get(coin).copied().unwrap_or(0.0)
}

/// `current_share / target_share - 1`; a held coin with no target share is
/// infinitely overweight.
fn deviation(current_share: f64, target_share: f64) -> f64 {
    if target_share > 0.0 {
        current_share / target_share - 1.0
    } else if current_share > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

fn intent_for(pos: &Position, price: f64) -> TradeIntent {
    TradeIntent {
        coin: pos.coin,
        action: if pos.deviation > 0.0 {
            Action::Sell
        } else {
            Action::Buy
        },
        price,
        amount: (pos.target_value - pos.current_value).abs() / price,
    }
}

/// Deduct a BUY from the budget. Returns false (budget untouched) if it doesn't fit.
fn try_spend(intent: &TradeIntent, budget: &mut f64) -> bool {
    if intent.action == Action::Sell {
        return true;
    }
    let cost = intent.notional();
    if cost > *budget + budget.abs() * BUDGET_TOLERANCE {
        return false;
    }
    *budget = (*budget - cost).max(0.0);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketInfo;

    fn c(s: &str) -> Coin {
        Coin::new(s)
    }

    fn snapshot(balances: &[(&str, f64)], markets: &[(&str, f64, f64)]) -> MarketSnapshot {
        MarketSnapshot::new(
            c("BTC"),
            balances.iter().map(|(s, a)| (c(s), *a)),
            markets
                .iter()
                .map(|(s, bid, ask)| (c(s), MarketInfo::new(*bid, *ask, *bid))),
            0.0,
        )
    }

    fn weights(pairs: &[(&str, f64)]) -> TargetWeights {
        TargetWeights::from_pairs(pairs.iter().map(|(s, w)| (c(s), *w))).unwrap()
    }

    #[test]
    fn deviation_signs() {
        assert!(deviation(0.6, 0.5) > 0.0);
        assert!(deviation(0.4, 0.5) < 0.0);
        assert_eq!(deviation(0.5, 0.5), 0.0);
        assert_eq!(deviation(0.3, 0.0), f64::INFINITY);
        assert_eq!(deviation(0.0, 0.5), -1.0);
    }

    #[test]
    fn try_spend_accepts_exact_budget() {
        let intent = TradeIntent {
            coin: c("BBR"),
            action: Action::Buy,
            price: 0.077,
            amount: 0.5 / 0.077,
        };
        let mut budget = 0.5;
        assert!(try_spend(&intent, &mut budget));
        assert!(budget.abs() < 1e-12);
    }

    #[test]
    fn try_spend_leaves_budget_on_reject() {
        let intent = TradeIntent {
            coin: c("BBR"),
            action: Action::Buy,
            price: 1.0,
            amount: 2.0,
        };
        let mut budget = 1.0;
        assert!(!try_spend(&intent, &mut budget));
        assert_eq!(budget, 1.0);
    }

    #[test]
    fn sells_never_consume_budget() {
        let intent = TradeIntent {
            coin: c("BBR"),
            action: Action::Sell,
            price: 1.0,
            amount: 100.0,
        };
        let mut budget = 0.0;
        assert!(try_spend(&intent, &mut budget));
        assert_eq!(budget, 0.0);
    }

    #[test]
    fn held_coin_without_target_is_sold_entirely() {
        let snap = snapshot(
            &[("BTC", 1.0), ("XMR", 10.0)],
            &[("XMR", 0.0099, 0.0101)],
        );
        let plan = plan(&weights(&[("BTC", 1.0)]), &snap, 0.1).unwrap();
        assert_eq!(plan.orders.len(), 1);
        assert_eq!(plan.orders[0].coin, c("XMR"));
        assert_eq!(plan.orders[0].action, Action::Sell);
        assert!((plan.orders[0].amount - 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_portfolio_is_config_error() {
        let snap = snapshot(&[], &[("BBR", 0.076, 0.078)]);
        let err = plan(&weights(&[("BBR", 1.0)]), &snap, 0.1).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn zero_target_sum_is_config_error() {
        let snap = snapshot(&[("BTC", 1.0)], &[]);
        let err = plan(&TargetWeights::new(), &snap, 0.1).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn negative_threshold_is_config_error() {
        let snap = snapshot(&[("BTC", 1.0)], &[]);
        assert!(plan(&weights(&[("BTC", 1.0)]), &snap, -0.1).is_err());
        assert!(plan(&weights(&[("BTC", 1.0)]), &snap, f64::NAN).is_err());
    }

    #[test]
    fn unpriced_target_is_missing_market() {
        let snap = snapshot(&[("BTC", 1.0)], &[]);
        let err = plan(&weights(&[("DOGE", 1.0)]), &snap, 0.1).unwrap_err();
        assert!(matches!(err, Error::MissingMarket(coin) if coin == c("DOGE")));
    }

    #[test]
    fn within_threshold_produces_nothing() {
        // 0.55 vs 0.45 against 1:1 targets: deviations +-0.1, threshold 0.2
        let snap = snapshot(&[("BTC", 0.55), ("ETH", 45.0)], &[("ETH", 0.01, 0.01)]);
        let plan = plan(&weights(&[("BTC", 1.0), ("ETH", 1.0)]), &snap, 0.2).unwrap();
        assert!(plan.is_empty());
        assert!(plan.completed);
    }

    #[test]
    fn buy_notional_sums_buys_only() {
        let plan = Plan {
            orders: vec![
                TradeIntent {
                    coin: c("ETH"),
                    action: Action::Buy,
                    price: 0.5,
                    amount: 2.0,
                },
                TradeIntent {
                    coin: c("XMR"),
                    action: Action::Sell,
                    price: 3.0,
                    amount: 3.0,
                },
            ],
            completed: true,
        };
        assert!((plan.buy_notional() - 1.0).abs() < 1e-12);
    }
}
