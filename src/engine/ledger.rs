//! Per-market trade history with an explicit cap.
//!
//! The map is keyed by market slug; each market's history sits behind its
//! own async mutex. Holding that lock from the trade-count gate through the
//! ledger append (including across the submission await) is what keeps
//! concurrent ticks from racing past the per-market cap.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::engine::snapshot::Side;

/// One executed trade.
#[derive(Clone, Debug)]
pub struct TradeRecord {
    pub side: Side,
    pub at: DateTime<Utc>,
    pub order_id: Option<String>,
}

/// Bounded trade history for one market.
#[derive(Debug, Default)]
pub struct MarketHistory {
    trades: Vec<TradeRecord>,
}

impl MarketHistory {
    #[must_use]
    pub fn count(&self) -> usize {
        self.trades.len()
    }

    #[must_use]
    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Appends unless the cap is already reached; the history length never
    /// exceeds `cap`.
    pub fn push_within_cap(&mut self, record: TradeRecord, cap: usize) -> bool {
        if self.trades.len() >= cap {
            return false;
        }
        self.trades.push(record);
        true
    }
}

/// Slug-keyed ledger of market histories.
#[derive(Debug, Default)]
pub struct TradeLedger {
    markets: DashMap<String, Arc<Mutex<MarketHistory>>>,
}

impl TradeLedger {
    /// The history cell for a market, created empty on first use.
    #[must_use]
    pub fn market(&self, slug: &str) -> Arc<Mutex<MarketHistory>> {
        Arc::clone(self.markets.entry(slug.to_owned()).or_default().value())
    }

    pub async fn count(&self, slug: &str) -> usize {
        self.market(slug).lock().await.count()
    }
}
