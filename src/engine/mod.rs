//! Trade decision engine.
//!
//! [`DecisionEngine::evaluate`] runs the ordered gate funnel against one
//! [`MarketSnapshot`] and produces exactly one [`Verdict`] per tick. The
//! funnel itself ([`funnel::evaluate`]) is a pure function; the engine owns
//! the mutable state around it: the per-market trade ledger, the token-id
//! registry, and the last-decision line.

pub mod funnel;
mod ledger;
mod snapshot;
mod trader;

pub use ledger::{MarketHistory, TradeLedger, TradeRecord};
pub use snapshot::{MarketSnapshot, Side};
pub use trader::{DecisionEngine, Verdict};

/// Dynamically discovered outcome token identifiers.
///
/// The one mutable part of the trading configuration; updated only through
/// [`TokenIds::update`] (or [`DecisionEngine::set_token_ids`]), where `None`
/// keeps the current value.
#[derive(Clone, Debug, Default)]
pub struct TokenIds {
    pub up: Option<String>,
    pub down: Option<String>,
}

impl TokenIds {
    #[must_use]
    pub fn for_side(&self, side: Side) -> Option<&str> {
        match side {
            Side::Up => self.up.as_deref(),
            Side::Down => self.down.as_deref(),
        }
        .filter(|token| !token.is_empty())
    }

    pub fn update(&mut self, up: Option<String>, down: Option<String>) {
        if up.is_some() {
            self.up = up;
        }
        if down.is_some() {
            self.down = down;
        }
    }
}
