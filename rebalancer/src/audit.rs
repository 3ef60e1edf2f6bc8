//! JSONL audit trail and CSV balance history.
//!
//! Each rebalancer run appends events to an audit.jsonl file, one JSON
//! object per line, and one `<unix-seconds>,<total>` line to the balance
//! history.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use coinbalance::{
    ExecutionListener, ExecutionReport, PendingOrder, Plan, TargetWeights, TradeIntent,
};
use log::warn;
use serde::Serialize;

use crate::error::Result;
use crate::execution::Holding;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }

    /// Log from a listener callback, where errors cannot propagate.
    fn log_or_warn(&mut self, event: &'static str, data: serde_json::Value) {
        if let Err(e) = self.log(event, data) {
            warn!("Failed to write {event} to audit log: {e}");
        }
    }
}

fn intent_json(intent: &TradeIntent) -> serde_json::Value {
    serde_json::json!({
        "coin": intent.coin.as_str(),
        "action": intent.action.as_str(),
        "price": intent.price,
        "amount": intent.amount,
    })
}

impl ExecutionListener for AuditLog {
    fn on_placed(&mut self, order: &PendingOrder, intent: &TradeIntent) {
        let mut data = intent_json(intent);
        data["id"] = order.id.0.into();
        self.log_or_warn("order_placed", data);
    }

    fn on_filled(&mut self, order: &PendingOrder) {
        self.log_or_warn(
            "order_filled",
            serde_json::json!({ "id": order.id.0, "coin": order.coin.as_str() }),
        );
    }

    fn on_cancelled(&mut self, order: &PendingOrder) {
        self.log_or_warn(
            "order_cancelled",
            serde_json::json!({ "id": order.id.0, "coin": order.coin.as_str() }),
        );
    }
}

/// Convenience: log a run start event.
pub fn log_run_started(
    audit: &mut AuditLog,
    target_source: &str,
    targets: &TargetWeights,
    threshold: f64,
    dry_run: bool,
) -> Result<()> {
    let weights: Vec<_> = targets
        .iter()
        .map(|(coin, weight)| serde_json::json!({ "coin": coin.as_str(), "weight": weight }))
        .collect();

    audit.log(
        "run_started",
        serde_json::json!({
            "target": target_source,
            "weights": weights,
            "threshold": threshold,
            "dry_run": dry_run,
        }),
    )
}

/// Convenience: log balances fetched with their quote-currency value.
pub fn log_balances(audit: &mut AuditLog, holdings: &[Holding], total: f64) -> Result<()> {
    let data: Vec<_> = holdings
        .iter()
        .map(|h| {
            serde_json::json!({
                "coin": h.coin.as_str(),
                "amount": h.amount,
                "value": h.value,
            })
        })
        .collect();

    audit.log(
        "balances_fetched",
        serde_json::json!({ "balances": data, "total": total }),
    )
}

/// Convenience: log the computed plan.
pub fn log_plan(audit: &mut AuditLog, plan: &Plan) -> Result<()> {
    let orders: Vec<_> = plan.orders.iter().map(intent_json).collect();
    audit.log(
        "plan_computed",
        serde_json::json!({ "orders": orders, "completed": plan.completed }),
    )
}

/// Convenience: log run completion.
pub fn log_run_completed(audit: &mut AuditLog, report: &ExecutionReport) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "placed": report.placed.len(),
            "filled": report.filled.len(),
            "cancelled": report.cancelled.len(),
            "polls": report.polls,
            "had_incomplete": report.had_incomplete,
        }),
    )
}

/// Append `<unix-seconds>,<total>` to the balance history file.
pub fn record_balance(path: &Path, total: f64) -> Result<()> {
    append_balance_line(path, Utc::now().timestamp(), total)
}

/// Append one balance history line with an explicit timestamp.
pub fn append_balance_line(path: &Path, unix_secs: i64, total: f64) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{unix_secs},{total}")?;
    Ok(())
}
