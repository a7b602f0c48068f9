//! Append-only CSV audit trails.
//!
//! Two stores: a decision/trade ledger (one row per TRADE or DRY_RUN) and an
//! order-outcome ledger (one row per attempted submission, failures
//! included). Headers are fixed per store and written only when a store is
//! created empty; existing records are never overwritten or truncated.
//!
//! Audit writes are for post-hoc inspection, not recovery, and must never
//! become a trading-availability hazard: failures are logged and swallowed.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use crate::config::TradingPolicy;

pub const TRADES_HEADER: [&str; 10] = [
    "timestamp",
    "market_slug",
    "side",
    "price_cents",
    "size_shares",
    "predict_pct",
    "time_left_min",
    "distance_usd",
    "reason",
    "order_id",
];

pub const ORDERS_HEADER: [&str; 10] = [
    "timestamp",
    "market_slug",
    "side",
    "price_cents",
    "size_shares",
    "signal",
    "recommendation",
    "order_status",
    "order_id",
    "error",
];

/// One trade-ledger row.
#[derive(Clone, Debug)]
pub struct TradeRow {
    pub timestamp: DateTime<Utc>,
    pub market_slug: String,
    pub side: String,
    pub price_cents: Decimal,
    pub size_shares: Decimal,
    pub predict_pct: f64,
    pub time_left_min: f64,
    pub distance_usd: f64,
    pub reason: String,
    pub order_id: String,
}

impl TradeRow {
    fn to_record(&self) -> [String; 10] {
        [
            self.timestamp.to_rfc3339(),
            self.market_slug.clone(),
            self.side.clone(),
            self.price_cents.to_string(),
            self.size_shares.to_string(),
            self.predict_pct.to_string(),
            format!("{:.3}", self.time_left_min),
            format!("{:.2}", self.distance_usd),
            self.reason.clone(),
            self.order_id.clone(),
        ]
    }
}

/// One order-ledger row.
#[derive(Clone, Debug)]
pub struct OrderRow {
    pub timestamp: DateTime<Utc>,
    pub market_slug: String,
    pub side: String,
    pub price_cents: Decimal,
    pub size_shares: Decimal,
    pub signal: String,
    pub recommendation: String,
    pub order_status: String,
    pub order_id: String,
    pub error: String,
}

impl OrderRow {
    fn to_record(&self) -> [String; 10] {
        [
            self.timestamp.to_rfc3339(),
            self.market_slug.clone(),
            self.side.clone(),
            self.price_cents.to_string(),
            self.size_shares.to_string(),
            self.signal.clone(),
            self.recommendation.clone(),
            self.order_status.clone(),
            self.order_id.clone(),
            self.error.clone(),
        ]
    }
}

/// The pair of audit stores used by the decision engine.
#[derive(Clone, Debug)]
pub struct AuditLog {
    trades_path: PathBuf,
    orders_path: PathBuf,
}

impl AuditLog {
    #[must_use]
    pub fn new(trades_path: PathBuf, orders_path: PathBuf) -> Self {
        Self {
            trades_path,
            orders_path,
        }
    }

    #[must_use]
    pub fn from_policy(policy: &TradingPolicy) -> Self {
        Self::new(policy.trades_csv.clone(), policy.orders_csv.clone())
    }

    /// Appends to the trade ledger; failures are logged, never raised.
    pub fn record_trade(&self, row: &TradeRow) {
        if let Err(err) = append(&self.trades_path, &TRADES_HEADER, &row.to_record()) {
            warn!(path = %self.trades_path.display(), %err, "trade ledger write failed");
        }
    }

    /// Appends to the order ledger; failures are logged, never raised.
    pub fn record_order(&self, row: &OrderRow) {
        if let Err(err) = append(&self.orders_path, &ORDERS_HEADER, &row.to_record()) {
            warn!(path = %self.orders_path.display(), %err, "order ledger write failed");
        }
    }
}

/// Appends a single record to a named store, creating it (and its parent
/// directories) with the given header when absent or empty.
pub fn append(path: &Path, header: &[&str], row: &[String]) -> Result<(), csv::Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_empty = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_empty {
        writer.write_record(header)?;
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}
