//! Order tracker: submit intents, poll until filled, force-cancel on timeout.
//!
//! Lifecycle of each intent:
//!
//! ```text
//! SUBMITTED ──place_order──▶ PENDING ──not open any more──▶ FILLED_OR_GONE
//!                               │
//!                               └──deadline passed──▶ FORCE_CANCELLED
//! ```
//!
//! The exchange no longer listing an order is the only fill signal; there is
//! no partial-fill state. Polling is blocking and sequential.

use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::error::Result;
use crate::exchange::Exchange;
use crate::types::{PendingOrder, TradeIntent};

/// Delay between two status sweeps over the pending set.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Callbacks fired as orders move through their lifecycle.
///
/// All methods default to no-ops; the unit type `()` is the silent listener.
pub trait ExecutionListener {
    fn on_placed(&mut self, _order: &PendingOrder, _intent: &TradeIntent) {}
    fn on_filled(&mut self, _order: &PendingOrder) {}
    fn on_cancelled(&mut self, _order: &PendingOrder) {}
}

impl ExecutionListener for () {}

/// What happened to a batch of intents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExecutionReport {
    /// Every order placed, in submission order.
    pub placed: Vec<PendingOrder>,
    /// Orders the exchange stopped listing before the deadline.
    pub filled: Vec<PendingOrder>,
    /// Orders still open at the deadline and cancelled.
    pub cancelled: Vec<PendingOrder>,
    /// Number of status sweeps performed.
    pub polls: usize,
    /// True if any order had to be force-cancelled.
    pub had_incomplete: bool,
}

/// Drives trade intents through an [`Exchange`].
pub struct OrderTracker<E> {
    exchange: E,
    poll_interval: Duration,
}

impl<E: Exchange> OrderTracker<E> {
    pub fn new(exchange: E) -> Self {
        Self {
            exchange,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the delay between status sweeps.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Cancel every open order on the account, so stale orders from an
    /// earlier run neither lock funds nor skew the snapshot.
    pub fn cancel_outstanding(&self) -> Result<()> {
        info!("Cancelling outstanding orders");
        self.exchange.cancel_all_orders()?;
        Ok(())
    }

    /// Submit `orders` and wait up to `timeout` for all of them to fill.
    ///
    /// Returns normally on timeout, with `had_incomplete` set and the
    /// stragglers already cancelled.
    ///
    /// # Errors
    ///
    /// A rejected placement aborts the batch: orders placed before it are
    /// cancelled (best effort) and the exchange error is returned. A failed
    /// status query likewise cancels everything still pending and returns.
    pub fn execute(&self, orders: &[TradeIntent], timeout: Duration) -> Result<ExecutionReport> {
        self.execute_with(orders, timeout, &mut ())
    }

    /// [`execute`](Self::execute) with lifecycle callbacks.
    pub fn execute_with<L: ExecutionListener + ?Sized>(
        &self,
        orders: &[TradeIntent],
        timeout: Duration,
        listener: &mut L,
    ) -> Result<ExecutionReport> {
        let start = Instant::now();
        let mut report = ExecutionReport::default();
        if orders.is_empty() {
            return Ok(report);
        }

        let mut pending = self.submit_all(orders, &mut report, listener)?;

        loop {
            if let Err(e) = self.poll(&mut pending, &mut report, listener) {
                error!("Order status check failed: {e}");
                self.force_cancel(&pending, &mut report, listener);
                return Err(e);
            }
            if pending.is_empty() {
                break;
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                break;
            }
            debug!(
                "{} order(s) pending, next check in {:?}",
                pending.len(),
                self.poll_interval.min(timeout - elapsed)
            );
            thread::sleep(self.poll_interval.min(timeout - elapsed));
        }

        if !pending.is_empty() {
            warn!(
                "Timed out after {:?} with {} order(s) open",
                start.elapsed(),
                pending.len()
            );
            self.force_cancel(&pending, &mut report, listener);
            report.had_incomplete = true;
        }

        info!(
            "Execution finished: {} placed, {} filled, {} cancelled",
            report.placed.len(),
            report.filled.len(),
            report.cancelled.len()
        );
        Ok(report)
    }

    fn submit_all<L: ExecutionListener + ?Sized>(
        &self,
        orders: &[TradeIntent],
        report: &mut ExecutionReport,
        listener: &mut L,
    ) -> Result<Vec<PendingOrder>> {
        let mut pending = Vec::with_capacity(orders.len());
        for (i, intent) in orders.iter().enumerate() {
            info!("[{}/{}] Placing {intent}", i + 1, orders.len());
            match self.exchange.place_order(intent) {
                Ok(id) => {
                    let order = PendingOrder {
                        id,
                        coin: intent.coin,
                    };
                    debug!("{} accepted as {id}", intent.coin);
                    listener.on_placed(&order, intent);
                    report.placed.push(order);
                    pending.push(order);
                }
                Err(e) => {
                    error!("Placement of {intent} failed: {e}");
                    if !pending.is_empty() {
                        warn!(
                            "Rolling back {} order(s) already placed in this batch",
                            pending.len()
                        );
                        self.force_cancel(&pending, report, listener);
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(pending)
    }

    /// One sweep: drop every order the exchange no longer lists as open.
    fn poll<L: ExecutionListener + ?Sized>(
        &self,
        pending: &mut Vec<PendingOrder>,
        report: &mut ExecutionReport,
        listener: &mut L,
    ) -> Result<()> {
        report.polls += 1;
        let mut i = 0;
        while i < pending.len() {
            let order = pending[i];
            if self.exchange.is_order_open(order.id, order.coin)? {
                i += 1;
                continue;
            }
            info!("Order {} for {} is filled", order.id, order.coin);
            pending.remove(i);
            listener.on_filled(&order);
            report.filled.push(order);
        }
        Ok(())
    }

    /// Cancel each order, logging (not propagating) individual failures.
    fn force_cancel<L: ExecutionListener + ?Sized>(
        &self,
        pending: &[PendingOrder],
        report: &mut ExecutionReport,
        listener: &mut L,
    ) {
        for order in pending {
            warn!("Cancelling order {} for {}", order.id, order.coin);
            if let Err(e) = self.exchange.cancel_order(order.id) {
                warn!("Failed to cancel order {}: {e}", order.id);
            }
            listener.on_cancelled(order);
            report.cancelled.push(*order);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Coin;
    use crate::mock::{FillMode, MockExchange};
    use crate::types::Action;

    fn intent(coin: &str) -> TradeIntent {
        TradeIntent {
            coin: Coin::new(coin),
            action: Action::Buy,
            price: 0.01,
            amount: 1.0,
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ExecutionListener for Recorder {
        fn on_placed(&mut self, order: &PendingOrder, _intent: &TradeIntent) {
            self.events.push(format!("placed {}", order.id));
        }
        fn on_filled(&mut self, order: &PendingOrder) {
            self.events.push(format!("filled {}", order.id));
        }
        fn on_cancelled(&mut self, order: &PendingOrder) {
            self.events.push(format!("cancelled {}", order.id));
        }
    }

    #[test]
    fn empty_batch_does_nothing() {
        let ex = MockExchange::builder().build();
        let report = OrderTracker::new(&ex)
            .execute(&[], Duration::from_secs(60))
            .unwrap();
        assert!(!report.had_incomplete);
        assert_eq!(report.polls, 0);
        assert_eq!(ex.status_checks(), 0);
    }

    #[test]
    fn fills_across_several_polls() {
        let ex = MockExchange::builder()
            .fill_mode(FillMode::AfterChecks(2))
            .build();
        let report = OrderTracker::new(&ex)
            .with_poll_interval(Duration::from_millis(1))
            .execute(&[intent("ETH"), intent("XMR")], Duration::from_secs(60))
            .unwrap();
        assert!(!report.had_incomplete);
        assert_eq!(report.polls, 3);
        assert_eq!(report.filled.len(), 2);
        assert!(ex.cancelled_orders().is_empty());
    }

    #[test]
    fn listener_sees_lifecycle() {
        let ex = MockExchange::builder().fill_mode(FillMode::Never).build();
        let mut rec = Recorder::default();
        OrderTracker::new(&ex)
            .with_poll_interval(Duration::from_millis(1))
            .execute_with(&[intent("ETH")], Duration::from_millis(5), &mut rec)
            .unwrap();
        assert_eq!(rec.events, vec!["placed #1", "cancelled #1"]);
    }

    #[test]
    fn status_failure_cancels_and_propagates() {
        let ex = MockExchange::builder().fail_status_checks().build();
        let err = OrderTracker::new(&ex)
            .execute(&[intent("ETH"), intent("XMR")], Duration::from_secs(60))
            .unwrap_err();
        assert!(matches!(err, crate::Error::Exchange(_)));
        assert_eq!(ex.cancelled_orders().len(), 2);
    }

    #[test]
    fn cancel_outstanding_calls_cancel_all() {
        let ex = MockExchange::builder().build();
        OrderTracker::new(&ex).cancel_outstanding().unwrap();
        assert_eq!(ex.cancel_all_calls(), 1);
    }

    #[test]
    fn default_poll_interval_is_thirty_seconds() {
        let ex = MockExchange::builder().build();
        assert_eq!(
            OrderTracker::new(&ex).poll_interval(),
            Duration::from_secs(30)
        );
    }
}
