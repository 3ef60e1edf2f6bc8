//! Planner scenarios against hand-checked reference portfolios.

use coinbalance::{Action, Coin, MarketInfo, MarketSnapshot, Plan, Planner, TargetWeights};

fn c(s: &str) -> Coin {
    Coin::new(s)
}

/// Relative closeness in percent, like a `CHECK_CLOSE(a, b, pct)`.
#[track_caller]
fn assert_close(actual: f64, expected: f64, pct: f64) {
    let diff = ((actual - expected) / expected).abs() * 100.0;
    assert!(
        diff <= pct,
        "{actual} not within {pct}% of {expected} (off by {diff:.6}%)"
    );
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

fn plan(targets: &[(&str, f64)], snap: &MarketSnapshot) -> Plan {
    Planner::new(weights(targets)).plan(snap, 0.1).unwrap()
}

/// The four altcoin markets used by the multi-coin fixtures.
const ALT_MARKETS: &[(&str, f64, f64)] = &[
    ("BBR", 0.00006251, 0.00006697),
    ("XMR", 0.00231134, 0.00232417),
    ("ETH", 0.00470002, 0.00473000),
    ("NXT", 0.00003533, 0.00003469),
];

// ============================================================================
// Single coin
// ============================================================================

#[test]
fn one_coin_all_in() {
    let snap = snapshot(&[("BTC", 0.5)], &[("BBR", 0.076, 0.078)]);

    let p = plan(&[("BBR", 1.0)], &snap);
    assert!(p.completed);
    assert_eq!(p.orders.len(), 1);
    assert_eq!(p.orders[0].action, Action::Buy);
    assert_eq!(p.orders[0].coin, c("BBR"));
    assert_close(p.orders[0].price, 0.077, 0.001);
    assert_close(p.orders[0].amount, 0.5 / 0.077, 0.001);
}

#[test]
fn one_coin_half_in_btc() {
    let snap = snapshot(&[("BTC", 0.5)], &[("BBR", 0.076, 0.078)]);

    let p = plan(&[("BBR", 1.0), ("BTC", 1.0)], &snap);
    assert_eq!(p.orders.len(), 1);
    assert_eq!(p.orders[0].action, Action::Buy);
    assert_eq!(p.orders[0].coin, c("BBR"));
    assert_close(p.orders[0].price, 0.077, 0.001);
    assert_close(p.orders[0].amount, 0.25 / 0.077, 0.001);
}

// ============================================================================
// Many coins
// ============================================================================

#[test]
fn many_coins() {
    let snap = snapshot(
        &[
            ("BTC", 0.21352728),
            ("BBR", 1265.05127482),
            ("ETH", 2.53003383),
            ("NXT", 330.53391706),
            ("XMR", 8.20689865),
        ],
        ALT_MARKETS,
    );

    let p = plan(
        &[
            ("BBR", 1.0),
            ("XMR", 1.0),
            ("BTC", 4.0),
            ("ETH", 1.0),
            ("NXT", 1.0),
        ],
        &snap,
    );

    assert!(p.completed);
    assert_eq!(p.orders.len(), 4);
    assert!(p.orders.iter().all(|o| o.coin != c("BTC")));

    let find = |s: &str| p.orders.iter().find(|o| o.coin == c(s)).unwrap();

    let bbr = find("BBR");
    assert_eq!(bbr.action, Action::Sell);
    assert_close(bbr.price, 0.00006474, 0.01);
    assert_close(bbr.amount, 612.54, 0.01);

    let eth = find("ETH");
    assert_eq!(eth.action, Action::Buy);
    assert_close(eth.price, 0.004715, 0.01);
    assert_close(eth.amount, 6.43, 0.01);

    let nxt = find("NXT");
    assert_eq!(nxt.action, Action::Buy);
    assert_close(nxt.price, 0.00003501, 0.01);
    assert_close(nxt.amount, 876.08, 0.01);

    let xmr = find("XMR");
    assert_eq!(xmr.action, Action::Buy);
    assert_close(xmr.price, 0.00231775, 0.01);
    assert_close(xmr.amount, 10.02, 0.01);
}

#[test]
fn many_coins_orders_sorted_by_coin() {
    let snap = snapshot(
        &[
            ("BTC", 0.21352728),
            ("BBR", 1265.05127482),
            ("ETH", 2.53003383),
            ("NXT", 330.53391706),
            ("XMR", 8.20689865),
        ],
        ALT_MARKETS,
    );
    let p = plan(
        &[("BBR", 1.0), ("XMR", 1.0), ("BTC", 4.0), ("ETH", 1.0), ("NXT", 1.0)],
        &snap,
    );
    let coins: Vec<&str> = p.orders.iter().map(|o| o.coin.as_str()).collect();
    assert_eq!(coins, vec!["BBR", "ETH", "NXT", "XMR"]);
}

// ============================================================================
// Completion flag
// ============================================================================

#[test]
fn only_target_held_is_complete() {
    let snap = snapshot(&[("BBR", 1000.0)], ALT_MARKETS);

    let p = plan(&[("BBR", 1.0)], &snap);
    assert!(p.completed);
    assert!(p.orders.is_empty());
}

#[test]
fn no_btc_to_buy_with_is_incomplete() {
    let snap = snapshot(&[("BBR", 1000.0)], ALT_MARKETS);

    let p = plan(&[("BBR", 1.0), ("XMR", 1.0)], &snap);
    assert!(!p.completed);
    assert_eq!(p.orders.len(), 1);
    assert_eq!(p.orders[0].coin, c("BBR"));
    assert_eq!(p.orders[0].action, Action::Sell);
    assert_close(p.orders[0].amount, 500.0, 0.001);
}

#[test]
fn budget_serves_buys_in_coin_order() {
    // 0.1 BTC budget, three coins each wanting ~0.0667 BTC: only ETH fits.
    let snap = snapshot(
        &[("BTC", 0.1), ("XMR", 0.1 / 0.002317755)],
        ALT_MARKETS,
    );
    let p = plan(&[("ETH", 1.0), ("NXT", 1.0), ("XMR", 1.0)], &snap);

    assert!(!p.completed);
    let buys: Vec<&str> = p
        .orders
        .iter()
        .filter(|o| o.action == Action::Buy)
        .map(|o| o.coin.as_str())
        .collect();
    assert_eq!(buys, vec!["ETH"]);
    assert!(p.buy_notional() <= 0.1 + 1e-12);
}

// ============================================================================
// Fallback on aggregate quote deviation
// ============================================================================

#[test]
fn fallback_corrects_widest_coin() {
    // BTC 0.40, AAA 0.29, BBB 0.31 of a 1.0 BTC portfolio against 1:1:1.
    // AAA -13%, BBB -7%: both inside 15%. BTC +20%: outside.
    let snap = snapshot(
        &[("BTC", 0.40), ("AAA", 29.0), ("BBB", 3.1)],
        &[("AAA", 0.01, 0.01), ("BBB", 0.1, 0.1)],
    );
    let p = Planner::new(weights(&[("BTC", 1.0), ("AAA", 1.0), ("BBB", 1.0)]))
        .plan(&snap, 0.15)
        .unwrap();

    assert!(p.completed);
    assert_eq!(p.orders.len(), 1);
    let o = &p.orders[0];
    assert_eq!(o.coin, c("AAA"));
    assert_eq!(o.action, Action::Buy);
    assert_close(o.price, 0.01, 1e-9);
    assert_close(o.amount, (1.0 / 3.0 - 0.29) / 0.01, 1e-6);
}

#[test]
fn fallback_sells_widest_overweight_coin() {
    // BTC 0.27, AAA 0.37, BBB 0.36 against 1:1:1.
    // AAA +11%, BBB +8%: both inside 15%. BTC -19%: outside.
    let snap = snapshot(
        &[("BTC", 0.27), ("AAA", 37.0), ("BBB", 3.6)],
        &[("AAA", 0.01, 0.01), ("BBB", 0.1, 0.1)],
    );
    let p = Planner::new(weights(&[("BTC", 1.0), ("AAA", 1.0), ("BBB", 1.0)]))
        .plan(&snap, 0.15)
        .unwrap();

    assert!(p.completed);
    assert_eq!(p.orders.len(), 1);
    let o = &p.orders[0];
    assert_eq!(o.coin, c("AAA"));
    assert_eq!(o.action, Action::Sell);
    assert_close(o.amount, (0.37 - 1.0 / 3.0) / 0.01, 1e-6);
}

#[test]
fn fallback_buy_over_budget_is_dropped() {
    // Targets 1:10:10. BTC holds 0.06 against a 0.0476 share (+26%).
    // AAA 0.41 (-13.9%) and BBB 0.53 (+11.3%) sit inside 15%, so the
    // fallback picks AAA, whose 0.0662 BTC shortfall exceeds the 0.06 held.
    let snap = snapshot(
        &[("BTC", 0.06), ("AAA", 41.0), ("BBB", 5.3)],
        &[("AAA", 0.01, 0.01), ("BBB", 0.1, 0.1)],
    );
    let p = Planner::new(weights(&[("BTC", 1.0), ("AAA", 10.0), ("BBB", 10.0)]))
        .plan(&snap, 0.15)
        .unwrap();

    assert!(p.orders.is_empty());
    assert!(!p.completed);
}

#[test]
fn no_fallback_when_quote_within_threshold() {
    let snap = snapshot(
        &[("BTC", 0.34), ("AAA", 33.0), ("BBB", 3.3)],
        &[("AAA", 0.01, 0.01), ("BBB", 0.1, 0.1)],
    );
    let p = Planner::new(weights(&[("BTC", 1.0), ("AAA", 1.0), ("BBB", 1.0)]))
        .plan(&snap, 0.15)
        .unwrap();
    assert!(p.orders.is_empty());
    assert!(p.completed);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn planning_twice_is_identical() {
    let snap = snapshot(
        &[("BTC", 0.21352728), ("BBR", 1265.05127482), ("ETH", 2.53003383)],
        ALT_MARKETS,
    );
    let planner = Planner::new(weights(&[("BBR", 1.0), ("ETH", 2.0), ("XMR", 1.0)]));
    let first = planner.plan(&snap, 0.05).unwrap();
    let second = planner.plan(&snap, 0.05).unwrap();
    assert_eq!(first, second);
}
