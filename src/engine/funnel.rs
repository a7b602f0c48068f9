//! The eligibility-gate funnel.
//!
//! A fixed, ordered sequence of gates runs against each snapshot; the first
//! failing gate short-circuits and its label becomes the skip reason. The
//! ordering is part of the contract: cheap structural gates (enablement,
//! missing data) run before pricing math, and test outputs depend on which
//! label wins when several gates would fail.

use std::fmt;

use rust_decimal::prelude::FromPrimitive as _;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::{PriceUnit, TradingPolicy};
use crate::engine::snapshot::{MarketSnapshot, Side};
use crate::engine::TokenIds;

const SIZE_DECIMALS: u32 = 4;
const PRICE_DECIMALS: u32 = 2;

/// Why the funnel stopped: a machine-readable label plus optional
/// `key=value` context, rendered as `label (k=v, ...)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SkipReason {
    label: &'static str,
    detail: Option<String>,
}

impl SkipReason {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            detail: None,
        }
    }

    fn with_detail(label: &'static str, detail: String) -> Self {
        Self {
            label,
            detail: Some(detail),
        }
    }

    /// The gate label alone, without context.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({detail})", self.label),
            None => f.write_str(self.label),
        }
    }
}

/// Output of a fully passed funnel: everything the engine needs to place
/// and audit the order. Price is in cents rounded to 2 decimals, size in
/// shares rounded to 4.
#[derive(Clone, Debug)]
pub struct TradePlan {
    pub side: Side,
    pub token_id: String,
    pub price_cents: Decimal,
    pub size_shares: Decimal,
    pub predict_pct: f64,
    pub time_left_min: f64,
    pub distance_usd: f64,
}

impl TradePlan {
    /// The terminal reason line for a passed funnel.
    #[must_use]
    pub fn reason(&self) -> String {
        format!(
            "trade_ready (side={}, price_cents={}, size_shares={})",
            self.side.as_str(),
            self.price_cents,
            self.size_shares
        )
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn cents_from_price(price: Option<f64>, unit: PriceUnit) -> Option<f64> {
    let price = finite(price)?;
    match unit {
        PriceUnit::Dollars => Some(price * 100.0),
        PriceUnit::Cents => Some(price),
    }
}

/// Runs the gate funnel for one snapshot.
///
/// `now_et_min` is the current minutes-of-day in the reference time zone and
/// `trades_for_market` the market's accumulated trade count; both are passed
/// in so the funnel stays a pure function of its arguments.
pub fn evaluate(
    policy: &TradingPolicy,
    tokens: &TokenIds,
    snapshot: &MarketSnapshot,
    now_et_min: u32,
    trades_for_market: usize,
) -> Result<TradePlan, SkipReason> {
    if !policy.enabled {
        return Err(SkipReason::new("disabled"));
    }

    if !policy.dry_run {
        if policy.account_type.is_none() {
            return Err(SkipReason::new("missing_account_type"));
        }
        if policy.private_key.is_none() {
            return Err(SkipReason::new("missing_private_key"));
        }
    }

    if snapshot
        .market_slug
        .as_deref()
        .is_none_or(|slug| slug.is_empty())
    {
        return Err(SkipReason::new("missing_market_slug"));
    }

    let Some(time_left_min) = finite(snapshot.time_left_min) else {
        return Err(SkipReason::new("missing_time_left"));
    };

    // Open window is exclusive below, inclusive above.
    if time_left_min <= policy.min_minutes_left || time_left_min > policy.max_minutes_left {
        return Err(SkipReason::with_detail(
            "outside_time_window",
            format!("time_left_min={time_left_min:.2}"),
        ));
    }

    if policy
        .blocked_et_windows
        .iter()
        .any(|window| window.contains(now_et_min))
    {
        return Err(SkipReason::new("blocked_et_window"));
    }

    let (Some(p_long), Some(p_short)) = (finite(snapshot.p_long), finite(snapshot.p_short))
    else {
        return Err(SkipReason::new("missing_predict"));
    };

    let side = if p_long >= policy.min_predict_pct && p_long > p_short {
        Side::Up
    } else if p_short >= policy.min_predict_pct && p_short > p_long {
        Side::Down
    } else {
        return Err(SkipReason::with_detail(
            "predict_below_threshold",
            format!("p_long={p_long}, p_short={p_short}"),
        ));
    };

    let heiken = snapshot
        .heiken_color
        .as_deref()
        .unwrap_or_default()
        .to_ascii_lowercase();
    if policy.require_heiken_color && heiken != side.expected_color() {
        return Err(SkipReason::with_detail(
            "heiken_mismatch",
            format!("heiken={heiken}, expected_color={}", side.expected_color()),
        ));
    }

    let heiken_count = snapshot.heiken_count.unwrap_or(0);
    if policy.min_heiken_count > 0 && heiken_count < policy.min_heiken_count {
        return Err(SkipReason::with_detail(
            "heiken_too_mixed",
            format!("heiken_count={heiken_count}"),
        ));
    }

    let raw_price = match side {
        Side::Up => snapshot.market_up,
        Side::Down => snapshot.market_down,
    };
    let Some(price_cents) = cents_from_price(raw_price, policy.price_unit) else {
        return Err(SkipReason::new("missing_market_price"));
    };

    if price_cents > policy.max_price_cents {
        return Err(SkipReason::with_detail(
            "price_too_high",
            format!("price_cents={price_cents}"),
        ));
    }

    let predict_pct = match side {
        Side::Up => p_long,
        Side::Down => p_short,
    };
    // Literal upstream comparison: the confidence score is scaled by 100
    // regardless of whether it arrives as a fraction or a percentage.
    if policy.enforce_price_vs_predict && price_cents > predict_pct * 100.0 {
        return Err(SkipReason::with_detail(
            "price_above_predict",
            format!("price_cents={price_cents}, predict_pct={predict_pct}"),
        ));
    }

    let (Some(current), Some(target)) = (
        finite(snapshot.current_price),
        finite(snapshot.price_to_beat),
    ) else {
        return Err(SkipReason::new("missing_price_to_beat"));
    };

    let distance_usd = (current - target).abs();
    let volatile = snapshot
        .regime
        .as_deref()
        .is_some_and(|regime| regime.starts_with("TREND"));
    let min_distance = if volatile {
        policy.min_distance_volatile_usd
    } else {
        policy.min_distance_quiet_usd
    };
    if distance_usd < min_distance {
        return Err(SkipReason::with_detail(
            "distance_too_small",
            format!("distance={distance_usd:.2}"),
        ));
    }

    if trades_for_market >= policy.max_trades_per_market {
        return Err(SkipReason::new("trade_limit_reached"));
    }

    let size_shares = if price_cents > 0.0 {
        policy.order_usd / (price_cents / 100.0)
    } else {
        f64::NAN
    };
    if !size_shares.is_finite() || size_shares <= 0.0 {
        return Err(SkipReason::new("invalid_order_size"));
    }

    let Some(token_id) = tokens.for_side(side) else {
        return Err(SkipReason::new("missing_token_id"));
    };

    let size_shares = Decimal::from_f64(size_shares)
        .map(|size| size.round_dp_with_strategy(SIZE_DECIMALS, RoundingStrategy::MidpointAwayFromZero))
        .ok_or_else(|| SkipReason::new("invalid_order_size"))?;
    let price_cents = Decimal::from_f64(price_cents)
        .map(|price| {
            price.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
        })
        .ok_or_else(|| SkipReason::new("missing_market_price"))?;

    Ok(TradePlan {
        side,
        token_id: token_id.to_owned(),
        price_cents,
        size_shares,
        predict_pct,
        time_left_min,
        distance_usd,
    })
}
