//! Trading policy configuration.
//!
//! The policy is loaded from the environment exactly once at startup and is
//! immutable afterwards; every component borrows it. Dynamically discovered
//! values (outcome token identifiers) live in [`crate::engine::TokenIds`],
//! a separate mutable sub-structure with a narrow setter.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_CLOB_BASE_URL: &str = "https://clob.polymarket.com";
const DEFAULT_BLOCKED_ET_WINDOWS: &str = "09:30-10:15";

/// Encoding applied to the HMAC signature bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureEncoding {
    Hex,
    Base64,
}

impl SignatureEncoding {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hex" => Ok(SignatureEncoding::Hex),
            "base64" => Ok(SignatureEncoding::Base64),
            other => Err(Error::config(format!(
                "invalid signature encoding `{other}`; expected hex|base64"
            ))),
        }
    }
}

/// Unit of the timestamp that is both signed and sent in the timestamp
/// header. The two must agree bit-for-bit, so the unit is fixed per policy,
/// never negotiated per request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimestampUnit {
    Seconds,
    Millis,
}

impl TimestampUnit {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "seconds" => Ok(TimestampUnit::Seconds),
            "ms" | "millis" | "milliseconds" => Ok(TimestampUnit::Millis),
            other => Err(Error::config(format!(
                "invalid timestamp unit `{other}`; expected s|ms"
            ))),
        }
    }
}

/// Unit in which outcome prices arrive in snapshots.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PriceUnit {
    Cents,
    Dollars,
}

impl PriceUnit {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cents" => Ok(PriceUnit::Cents),
            "dollars" => Ok(PriceUnit::Dollars),
            other => Err(Error::config(format!(
                "invalid price unit `{other}`; expected cents|dollars"
            ))),
        }
    }
}

/// Exchange account classifier required for live trading.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccountType {
    Email,
    Wallet,
}

impl AccountType {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(AccountType::Email),
            "wallet" => Ok(AccountType::Wallet),
            other => Err(Error::config(format!(
                "invalid account type `{other}`; expected email|wallet"
            ))),
        }
    }
}

/// A blocked time-of-day interval in the reference time zone, minutes since
/// midnight. `start_min > end_min` means the interval wraps past midnight.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockedWindow {
    pub start_min: u32,
    pub end_min: u32,
}

impl BlockedWindow {
    /// Both bounds are inclusive.
    #[must_use]
    pub fn contains(&self, now_min: u32) -> bool {
        if self.start_min <= self.end_min {
            now_min >= self.start_min && now_min <= self.end_min
        } else {
            now_min >= self.start_min || now_min <= self.end_min
        }
    }
}

/// Parses comma-separated `HH:MM-HH:MM` windows. Minutes may be omitted
/// (`9-10` reads as `9:00-10:00`). Malformed chunks are skipped.
#[must_use]
pub fn parse_blocked_windows(input: &str) -> Vec<BlockedWindow> {
    input
        .split(',')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .filter_map(parse_window)
        .collect()
}

fn parse_window(chunk: &str) -> Option<BlockedWindow> {
    let (start, end) = chunk.split_once('-')?;
    Some(BlockedWindow {
        start_min: parse_hhmm(start)?,
        end_min: parse_hhmm(end)?,
    })
}

fn parse_hhmm(value: &str) -> Option<u32> {
    let value = value.trim();
    let (hours, minutes): (u32, u32) = match value.split_once(':') {
        Some((h, m)) => (h.trim().parse().ok()?, m.trim().parse().ok()?),
        None => (value.parse().ok()?, 0u32),
    };
    Some(hours * 60 + minutes)
}

/// Immutable per-run trading policy.
///
/// `Default` carries the stock thresholds; [`TradingPolicy::from_env`]
/// overrides them from the environment.
#[derive(Clone, Debug)]
pub struct TradingPolicy {
    pub enabled: bool,
    pub dry_run: bool,
    pub account_type: Option<AccountType>,
    pub private_key: Option<SecretString>,
    pub api_key: Option<String>,
    pub api_secret: Option<SecretString>,
    pub api_passphrase: Option<String>,
    pub clob_base_url: Url,
    pub order_path: String,
    pub order_type: String,
    pub time_in_force: String,
    pub signature_encoding: SignatureEncoding,
    pub timestamp_unit: TimestampUnit,
    pub request_timeout: Duration,
    pub order_usd: f64,
    pub min_minutes_left: f64,
    pub max_minutes_left: f64,
    pub min_predict_pct: f64,
    pub enforce_price_vs_predict: bool,
    pub max_price_cents: f64,
    pub min_distance_quiet_usd: f64,
    pub min_distance_volatile_usd: f64,
    pub require_heiken_color: bool,
    pub min_heiken_count: u32,
    pub max_trades_per_market: usize,
    pub blocked_et_windows: Vec<BlockedWindow>,
    pub price_unit: PriceUnit,
    pub trades_csv: PathBuf,
    pub orders_csv: PathBuf,
}

impl Default for TradingPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            dry_run: true,
            account_type: None,
            private_key: None,
            api_key: None,
            api_secret: None,
            api_passphrase: None,
            clob_base_url: Url::parse(DEFAULT_CLOB_BASE_URL).expect("default base url is valid"),
            order_path: "/order".into(),
            order_type: "limit".into(),
            time_in_force: "gtc".into(),
            signature_encoding: SignatureEncoding::Hex,
            timestamp_unit: TimestampUnit::Seconds,
            request_timeout: Duration::from_millis(10_000),
            order_usd: 10.0,
            min_minutes_left: 5.0,
            max_minutes_left: 9.0,
            min_predict_pct: 0.65,
            enforce_price_vs_predict: true,
            max_price_cents: 99.0,
            min_distance_quiet_usd: 50.0,
            min_distance_volatile_usd: 100.0,
            require_heiken_color: true,
            min_heiken_count: 2,
            max_trades_per_market: 1,
            blocked_et_windows: parse_blocked_windows(DEFAULT_BLOCKED_ET_WINDOWS),
            price_unit: PriceUnit::Cents,
            trades_csv: PathBuf::from("./logs/trades.csv"),
            orders_csv: PathBuf::from("./logs/orders.csv"),
        }
    }
}

impl TradingPolicy {
    /// Reads the policy from the environment.
    ///
    /// Unset and empty variables fall back to defaults; malformed numeric or
    /// enum values are load-time errors rather than silently degraded
    /// thresholds.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let base_url = match env_string("POLYMARKET_CLOB_BASE_URL") {
            Some(raw) => Url::parse(&raw)?,
            None => defaults.clob_base_url,
        };

        Ok(Self {
            enabled: env_bool("POLYMARKET_AUTO_TRADE", defaults.enabled),
            dry_run: env_bool("POLYMARKET_DRY_RUN", defaults.dry_run),
            account_type: env_string("POLYMARKET_ACCOUNT_TYPE")
                .map(|raw| AccountType::parse(&raw))
                .transpose()?,
            private_key: env_string("POLYMARKET_PRIVATE_KEY").map(SecretString::from),
            api_key: env_string("POLYMARKET_CLOB_API_KEY"),
            api_secret: env_string("POLYMARKET_CLOB_API_SECRET").map(SecretString::from),
            api_passphrase: env_string("POLYMARKET_CLOB_API_PASSPHRASE"),
            clob_base_url: base_url,
            order_path: env_string("POLYMARKET_CLOB_ORDER_PATH")
                .unwrap_or(defaults.order_path),
            order_type: env_string("POLYMARKET_CLOB_ORDER_TYPE")
                .unwrap_or(defaults.order_type),
            time_in_force: env_string("POLYMARKET_CLOB_TIME_IN_FORCE")
                .unwrap_or(defaults.time_in_force),
            signature_encoding: env_parse_with(
                "POLYMARKET_CLOB_SIGNATURE_ENCODING",
                defaults.signature_encoding,
                SignatureEncoding::parse,
            )?,
            timestamp_unit: env_parse_with(
                "POLYMARKET_CLOB_TIMESTAMP_UNIT",
                defaults.timestamp_unit,
                TimestampUnit::parse,
            )?,
            request_timeout: Duration::from_millis(env_number(
                "POLYMARKET_CLOB_TIMEOUT_MS",
                10_000u64,
            )?),
            order_usd: env_number("POLYMARKET_ORDER_USD", defaults.order_usd)?,
            min_minutes_left: env_number(
                "POLYMARKET_MIN_MINUTES_LEFT",
                defaults.min_minutes_left,
            )?,
            max_minutes_left: env_number(
                "POLYMARKET_MAX_MINUTES_LEFT",
                defaults.max_minutes_left,
            )?,
            min_predict_pct: env_number(
                "POLYMARKET_MIN_PREDICT_PCT",
                defaults.min_predict_pct,
            )?,
            enforce_price_vs_predict: env_bool(
                "POLYMARKET_ENFORCE_PRICE_VS_PREDICT",
                defaults.enforce_price_vs_predict,
            ),
            max_price_cents: env_number(
                "POLYMARKET_MAX_PRICE_CENTS",
                defaults.max_price_cents,
            )?,
            min_distance_quiet_usd: env_number(
                "POLYMARKET_MIN_DISTANCE_QUIET_USD",
                defaults.min_distance_quiet_usd,
            )?,
            min_distance_volatile_usd: env_number(
                "POLYMARKET_MIN_DISTANCE_VOLATILE_USD",
                defaults.min_distance_volatile_usd,
            )?,
            require_heiken_color: env_bool(
                "POLYMARKET_REQUIRE_HEIKEN_COLOR",
                defaults.require_heiken_color,
            ),
            min_heiken_count: env_number(
                "POLYMARKET_MIN_HEIKEN_COUNT",
                defaults.min_heiken_count,
            )?,
            max_trades_per_market: env_number(
                "POLYMARKET_MAX_TRADES_PER_MARKET",
                defaults.max_trades_per_market,
            )?,
            blocked_et_windows: env_string("POLYMARKET_BLOCKED_ET_WINDOWS")
                .map_or(defaults.blocked_et_windows, |raw| {
                    parse_blocked_windows(&raw)
                }),
            price_unit: env_parse_with(
                "POLYMARKET_PRICE_UNIT",
                defaults.price_unit,
                PriceUnit::parse,
            )?,
            trades_csv: env_string("POLYMARKET_TRADES_CSV")
                .map_or(defaults.trades_csv, PathBuf::from),
            orders_csv: env_string("POLYMARKET_ORDERS_CSV")
                .map_or(defaults.orders_csv, PathBuf::from),
        })
    }

    /// True when the full static credential triple is configured.
    #[must_use]
    pub fn has_static_credentials(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some() && self.api_passphrase.is_some()
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_bool(name: &str, default: bool) -> bool {
    env_string(name).map_or(default, |value| value.trim().eq_ignore_ascii_case("true"))
}

fn env_number<T: FromStr + Copy>(name: &str, default: T) -> Result<T> {
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("invalid numeric value for {name}: `{raw}`"))),
        None => Ok(default),
    }
}

fn env_parse_with<T>(name: &str, default: T, parse: fn(&str) -> Result<T>) -> Result<T> {
    match env_string(name) {
        Some(raw) => parse(&raw),
        None => Ok(default),
    }
}
