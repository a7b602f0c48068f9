//! The decision engine: one verdict per snapshot.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::audit::{AuditLog, OrderRow, TradeRow};
use crate::clock;
use crate::config::{PriceUnit, TradingPolicy};
use crate::engine::TokenIds;
use crate::engine::funnel::{self, TradePlan};
use crate::engine::ledger::{TradeLedger, TradeRecord};
use crate::engine::snapshot::MarketSnapshot;
use crate::gateway::{OrderAck, OrderIntent, OrderSubmitter};

/// Terminal outcome of one evaluation. Always produced, never thrown:
/// submission errors are folded into [`Verdict::Failed`] at this boundary.
#[derive(Clone, Debug)]
pub enum Verdict {
    Skip { reason: String },
    DryRun { reason: String },
    Trade { reason: String, ack: OrderAck },
    Failed { reason: String },
}

impl Verdict {
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Verdict::Skip { .. } => "SKIP",
            Verdict::DryRun { .. } => "DRY_RUN",
            Verdict::Trade { .. } => "TRADE",
            Verdict::Failed { .. } => "FAILED",
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Verdict::Skip { reason }
            | Verdict::DryRun { reason }
            | Verdict::Trade { reason, .. }
            | Verdict::Failed { reason } => reason,
        }
    }
}

/// Evaluates the gate funnel against market snapshots and, on a full pass,
/// sizes and submits the order (or simulates it in dry-run mode).
pub struct DecisionEngine<S> {
    policy: Arc<TradingPolicy>,
    submitter: S,
    audit: AuditLog,
    tokens: RwLock<TokenIds>,
    ledger: TradeLedger,
    last_decision: Mutex<Option<(&'static str, String)>>,
    shutdown: CancellationToken,
}

impl<S: OrderSubmitter> DecisionEngine<S> {
    #[must_use]
    pub fn new(policy: Arc<TradingPolicy>, submitter: S, audit: AuditLog) -> Self {
        Self {
            policy,
            submitter,
            audit,
            tokens: RwLock::new(TokenIds::default()),
            ledger: TradeLedger::default(),
            last_decision: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancels an in-flight submission when the token fires; the attempt is
    /// still written to the order ledger.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Narrow setter for dynamically discovered token identifiers. `None`
    /// keeps the current value.
    pub fn set_token_ids(&self, up: Option<String>, down: Option<String>) {
        let mut tokens = self
            .tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        tokens.update(up, down);
    }

    #[must_use]
    pub fn token_ids(&self) -> TokenIds {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Accumulated trade count for a market.
    pub async fn trade_count(&self, slug: &str) -> usize {
        self.ledger.count(slug).await
    }

    /// Human-readable line for the most recent decision, empty before the
    /// first evaluation.
    #[must_use]
    pub fn status_line(&self) -> String {
        self.last_decision
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(action, reason)| format!("AutoTrade: {action} | {reason}"))
            .unwrap_or_default()
    }

    /// Evaluates one snapshot against the wall clock.
    pub async fn evaluate(&self, snapshot: &MarketSnapshot) -> Verdict {
        self.evaluate_at(snapshot, clock::now_minutes_et()).await
    }

    /// Evaluates one snapshot at an explicit reference-zone time of day.
    pub async fn evaluate_at(&self, snapshot: &MarketSnapshot, now_et_min: u32) -> Verdict {
        let tokens = self.token_ids();
        let slug = snapshot.market_slug.clone().unwrap_or_default();

        // The market lock spans the count gate, the submission, and the
        // ledger append; a concurrent tick for the same market waits here.
        let market = self.ledger.market(&slug);
        let mut history = market.lock().await;

        let plan = match funnel::evaluate(
            &self.policy,
            &tokens,
            snapshot,
            now_et_min,
            history.count(),
        ) {
            Ok(plan) => plan,
            Err(skip) => {
                let reason = skip.to_string();
                debug!(market = %slug, %reason, "snapshot skipped");
                return self.finish(Verdict::Skip { reason });
            }
        };

        let reason = plan.reason();

        if self.policy.dry_run {
            self.audit
                .record_trade(&self.trade_row(&slug, &plan, "dry_run", String::new()));
            self.audit
                .record_order(&self.order_row(&slug, snapshot, &plan, "dry_run", String::new(), String::new()));
            info!(market = %slug, %reason, "dry run");
            return self.finish(Verdict::DryRun { reason });
        }

        let intent = OrderIntent {
            token_id: plan.token_id.clone(),
            side: plan.side.exchange_side(),
            price: match self.policy.price_unit {
                PriceUnit::Dollars => plan.price_cents / dec!(100),
                PriceUnit::Cents => plan.price_cents,
            },
            size: plan.size_shares,
            order_type: self.policy.order_type.clone(),
            time_in_force: self.policy.time_in_force.clone(),
        };

        let submission = tokio::select! {
            () = self.shutdown.cancelled() => None,
            result = self.submitter.submit(&intent) => Some(result),
        };

        match submission {
            None => {
                let reason = "submission canceled by shutdown".to_owned();
                warn!(market = %slug, "shutdown during submission");
                self.audit.record_order(&self.order_row(
                    &slug,
                    snapshot,
                    &plan,
                    "canceled",
                    String::new(),
                    reason.clone(),
                ));
                self.finish(Verdict::Failed { reason })
            }
            Some(Err(err)) => {
                let message = err.to_string();
                warn!(market = %slug, error = %message, "order submission failed");
                self.audit.record_order(&self.order_row(
                    &slug,
                    snapshot,
                    &plan,
                    "failed",
                    String::new(),
                    message.clone(),
                ));
                self.finish(Verdict::Failed { reason: message })
            }
            Some(Ok(ack)) => {
                let recorded = history.push_within_cap(
                    TradeRecord {
                        side: plan.side,
                        at: Utc::now(),
                        order_id: ack.order_id.clone(),
                    },
                    self.policy.max_trades_per_market,
                );
                debug_assert!(recorded, "count gate ran under the same market lock");

                self.audit.record_trade(&self.trade_row(
                    &slug,
                    &plan,
                    "submitted",
                    ack.order_id_or_empty(),
                ));
                self.audit.record_order(&self.order_row(
                    &slug,
                    snapshot,
                    &plan,
                    &ack.status_or("submitted"),
                    ack.order_id_or_empty(),
                    String::new(),
                ));
                info!(market = %slug, order_id = %ack.order_id_or_empty(), %reason, "trade placed");
                self.finish(Verdict::Trade { reason, ack })
            }
        }
    }

    fn finish(&self, verdict: Verdict) -> Verdict {
        let mut last = self
            .last_decision
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *last = Some((verdict.action(), verdict.reason().to_owned()));
        drop(last);
        verdict
    }

    fn trade_row(&self, slug: &str, plan: &TradePlan, reason: &str, order_id: String) -> TradeRow {
        TradeRow {
            timestamp: Utc::now(),
            market_slug: slug.to_owned(),
            side: plan.side.as_str().to_owned(),
            price_cents: plan.price_cents,
            size_shares: plan.size_shares,
            predict_pct: plan.predict_pct,
            time_left_min: plan.time_left_min,
            distance_usd: plan.distance_usd,
            reason: reason.to_owned(),
            order_id,
        }
    }

    fn order_row(
        &self,
        slug: &str,
        snapshot: &MarketSnapshot,
        plan: &TradePlan,
        status: &str,
        order_id: String,
        error: String,
    ) -> OrderRow {
        OrderRow {
            timestamp: Utc::now(),
            market_slug: slug.to_owned(),
            side: plan.side.as_str().to_owned(),
            price_cents: plan.price_cents,
            size_shares: plan.size_shares,
            signal: snapshot.signal.clone().unwrap_or_default(),
            recommendation: snapshot.recommendation.clone().unwrap_or_default(),
            order_status: status.to_owned(),
            order_id,
            error,
        }
    }
}
