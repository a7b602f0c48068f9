//! Decision-engine behavior over fake submitters: dry-run isolation, live
//! trade flow, failure handling, per-market caps, and audit output.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use clob_autotrader::audit::AuditLog;
use clob_autotrader::config::{AccountType, TradingPolicy};
use clob_autotrader::engine::{DecisionEngine, MarketSnapshot, Verdict};
use clob_autotrader::error::{Error, Result};
use clob_autotrader::gateway::{OrderAck, OrderIntent, OrderSubmitter};
use tokio_util::sync::CancellationToken;

const NOON_ET: u32 = 12 * 60;

#[derive(Clone, Copy)]
enum Mode {
    Accept,
    Reject,
    Hang,
}

#[derive(Clone)]
struct FakeSubmitter {
    calls: Arc<AtomicUsize>,
    mode: Mode,
}

impl FakeSubmitter {
    fn new(mode: Mode) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
                mode,
            },
            calls,
        )
    }
}

#[async_trait]
impl OrderSubmitter for FakeSubmitter {
    async fn submit(&self, _intent: &OrderIntent) -> Result<OrderAck> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            Mode::Accept => Ok(OrderAck {
                status: Some("live".to_owned()),
                order_id: Some("order-1".to_owned()),
            }),
            Mode::Reject => Err(Error::Gateway {
                status: 500,
                body: "matching engine unavailable".to_owned(),
            }),
            Mode::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(OrderAck::default())
            }
        }
    }
}

struct Harness {
    engine: DecisionEngine<FakeSubmitter>,
    calls: Arc<AtomicUsize>,
    trades_csv: PathBuf,
    orders_csv: PathBuf,
    _dir: tempfile::TempDir,
}

fn harness(policy: TradingPolicy, mode: Mode) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let trades_csv = dir.path().join("trades.csv");
    let orders_csv = dir.path().join("orders.csv");
    let audit = AuditLog::new(trades_csv.clone(), orders_csv.clone());

    let (submitter, calls) = FakeSubmitter::new(mode);
    let engine = DecisionEngine::new(Arc::new(policy), submitter, audit);
    engine.set_token_ids(Some("token-up".to_owned()), Some("token-down".to_owned()));

    Harness {
        engine,
        calls,
        trades_csv,
        orders_csv,
        _dir: dir,
    }
}

fn dry_run_policy() -> TradingPolicy {
    TradingPolicy {
        enabled: true,
        enforce_price_vs_predict: false,
        ..TradingPolicy::default()
    }
}

fn live_policy() -> TradingPolicy {
    TradingPolicy {
        dry_run: false,
        account_type: Some(AccountType::Wallet),
        private_key: Some("0x01".to_owned().into()),
        ..dry_run_policy()
    }
}

fn snapshot() -> MarketSnapshot {
    MarketSnapshot {
        market_slug: Some("btc-updown-15m".to_owned()),
        time_left_min: Some(7.0),
        p_long: Some(0.70),
        p_short: Some(0.20),
        heiken_color: Some("green".to_owned()),
        heiken_count: Some(3),
        market_up: Some(80.0),
        market_down: Some(20.0),
        price_to_beat: Some(50_000.0),
        current_price: Some(50_120.0),
        regime: Some("RANGE".to_owned()),
        signal: Some("LONG".to_owned()),
        recommendation: Some("BUY_UP".to_owned()),
    }
}

#[tokio::test]
async fn dry_run_never_invokes_the_submitter() {
    let h = harness(dry_run_policy(), Mode::Accept);

    let verdict = h.engine.evaluate_at(&snapshot(), NOON_ET).await;
    assert!(matches!(verdict, Verdict::DryRun { .. }));
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);

    // Audit rows are written, the ledger is not.
    let trades = fs::read_to_string(&h.trades_csv).unwrap();
    assert!(trades.contains("dry_run"));
    assert!(trades.contains("12.5"));
    let orders = fs::read_to_string(&h.orders_csv).unwrap();
    assert!(orders.contains("dry_run"));
    assert!(orders.contains("LONG"));
    assert_eq!(h.engine.trade_count("btc-updown-15m").await, 0);
}

#[tokio::test]
async fn dry_run_skip_also_stays_off_the_network() {
    let h = harness(dry_run_policy(), Mode::Accept);
    let mut snap = snapshot();
    snap.time_left_min = Some(4.0);

    let verdict = h.engine.evaluate_at(&snap, NOON_ET).await;
    assert!(matches!(verdict, Verdict::Skip { .. }));
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    assert!(!h.trades_csv.exists());
}

#[tokio::test]
async fn live_full_pass_places_the_worked_example_trade() {
    let h = harness(live_policy(), Mode::Accept);

    let verdict = h.engine.evaluate_at(&snapshot(), NOON_ET).await;
    let Verdict::Trade { reason, ack } = verdict else {
        panic!("expected TRADE, got {verdict:?}");
    };
    assert_eq!(reason, "trade_ready (side=UP, price_cents=80, size_shares=12.5)");
    assert_eq!(ack.order_id_or_empty(), "order-1");
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.engine.trade_count("btc-updown-15m").await, 1);

    let trades = fs::read_to_string(&h.trades_csv).unwrap();
    assert!(trades.starts_with("timestamp,market_slug,side,"));
    assert!(trades.contains("submitted"));
    assert!(trades.contains("order-1"));
    let orders = fs::read_to_string(&h.orders_csv).unwrap();
    assert!(orders.contains("live"));
    assert!(orders.contains("order-1"));

    assert_eq!(
        h.engine.status_line(),
        "AutoTrade: TRADE | trade_ready (side=UP, price_cents=80, size_shares=12.5)"
    );
}

#[tokio::test]
async fn failed_submission_is_a_verdict_not_a_fault() {
    let h = harness(live_policy(), Mode::Reject);

    let verdict = h.engine.evaluate_at(&snapshot(), NOON_ET).await;
    let Verdict::Failed { reason } = verdict else {
        panic!("expected FAILED, got {verdict:?}");
    };
    assert!(reason.contains("500"));
    assert!(reason.contains("matching engine unavailable"));

    // The trade did not happen: no ledger entry, no trades row.
    assert_eq!(h.engine.trade_count("btc-updown-15m").await, 0);
    assert!(!h.trades_csv.exists());
    let orders = fs::read_to_string(&h.orders_csv).unwrap();
    assert!(orders.contains("failed"));
    assert!(orders.contains("matching engine unavailable"));
    assert!(h.engine.status_line().starts_with("AutoTrade: FAILED | "));
}

#[tokio::test]
async fn per_market_cap_holds_across_a_sequence_of_ticks() {
    let mut policy = live_policy();
    policy.max_trades_per_market = 2;
    let h = harness(policy, Mode::Accept);

    for _ in 0..2 {
        let verdict = h.engine.evaluate_at(&snapshot(), NOON_ET).await;
        assert!(matches!(verdict, Verdict::Trade { .. }));
    }
    let verdict = h.engine.evaluate_at(&snapshot(), NOON_ET).await;
    let Verdict::Skip { reason } = verdict else {
        panic!("expected SKIP, got {verdict:?}");
    };
    assert_eq!(reason, "trade_limit_reached");
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.engine.trade_count("btc-updown-15m").await, 2);

    // A different market still has room.
    let mut other = snapshot();
    other.market_slug = Some("eth-updown-15m".to_owned());
    let verdict = h.engine.evaluate_at(&other, NOON_ET).await;
    assert!(matches!(verdict, Verdict::Trade { .. }));
}

#[tokio::test]
async fn skips_update_the_status_line_without_audit_rows() {
    let h = harness(TradingPolicy::default(), Mode::Accept);

    assert_eq!(h.engine.status_line(), "");
    let verdict = h.engine.evaluate_at(&snapshot(), NOON_ET).await;
    assert!(matches!(verdict, Verdict::Skip { .. }));
    assert_eq!(verdict.reason(), "disabled");
    assert_eq!(h.engine.status_line(), "AutoTrade: SKIP | disabled");
    assert!(!h.trades_csv.exists());
    assert!(!h.orders_csv.exists());
}

#[tokio::test]
async fn blocked_window_applies_at_the_engine_level() {
    let h = harness(dry_run_policy(), Mode::Accept);
    // 09:45 ET falls inside the default 09:30-10:15 block.
    let verdict = h.engine.evaluate_at(&snapshot(), 9 * 60 + 45).await;
    assert_eq!(verdict.reason(), "blocked_et_window");
}

#[tokio::test]
async fn missing_token_id_when_discovery_has_not_run() {
    let dir = tempfile::tempdir().unwrap();
    let audit = AuditLog::new(dir.path().join("t.csv"), dir.path().join("o.csv"));
    let (submitter, _calls) = FakeSubmitter::new(Mode::Accept);
    let engine = DecisionEngine::new(Arc::new(dry_run_policy()), submitter, audit);

    let verdict = engine.evaluate_at(&snapshot(), NOON_ET).await;
    assert_eq!(verdict.reason(), "missing_token_id");
}

#[tokio::test]
async fn shutdown_cancels_the_submission_but_keeps_the_audit_record() {
    let token = CancellationToken::new();
    let dir = tempfile::tempdir().unwrap();
    let trades_csv = dir.path().join("trades.csv");
    let orders_csv = dir.path().join("orders.csv");
    let audit = AuditLog::new(trades_csv.clone(), orders_csv.clone());

    let (submitter, calls) = FakeSubmitter::new(Mode::Hang);
    let engine = DecisionEngine::new(Arc::new(live_policy()), submitter, audit)
        .with_shutdown(token.clone());
    engine.set_token_ids(Some("token-up".to_owned()), None);

    token.cancel();
    let verdict = engine.evaluate_at(&snapshot(), NOON_ET).await;
    let Verdict::Failed { reason } = verdict else {
        panic!("expected FAILED, got {verdict:?}");
    };
    assert_eq!(reason, "submission canceled by shutdown");
    assert_eq!(engine.trade_count("btc-updown-15m").await, 0);
    assert!(calls.load(Ordering::SeqCst) <= 1);

    let orders = fs::read_to_string(&orders_csv).unwrap();
    assert!(orders.contains("canceled"));
    assert!(orders.contains("submission canceled by shutdown"));
    assert!(!trades_csv.exists());
}
