//! Market snapshot handed to the engine, one per tick.

use crate::gateway::ExchangeSide;

/// Candidate trade direction.
///
/// Replaces the wire-format strings with a closed enum; conversion to the
/// exchange vocabulary happens in one place.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    Up,
    Down,
}

impl Side {
    /// Audit-trail label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Up => "UP",
            Side::Down => "DOWN",
        }
    }

    /// Either direction buys its own outcome token on the book.
    #[must_use]
    pub const fn exchange_side(self) -> ExchangeSide {
        ExchangeSide::Buy
    }

    /// Trend-confirmation color that affirms this direction.
    #[must_use]
    pub const fn expected_color(self) -> &'static str {
        match self {
            Side::Up => "green",
            Side::Down => "red",
        }
    }
}

/// Flat snapshot of externally computed signals for one market.
///
/// Every numeric field is optional: collaborators omit what they could not
/// compute, and the funnel treats missing and non-finite values alike.
/// `signal` and `recommendation` are opaque labels carried through for the
/// audit trail only.
#[derive(Clone, Debug, Default)]
pub struct MarketSnapshot {
    pub market_slug: Option<String>,
    pub time_left_min: Option<f64>,
    pub p_long: Option<f64>,
    pub p_short: Option<f64>,
    pub heiken_color: Option<String>,
    pub heiken_count: Option<u32>,
    pub market_up: Option<f64>,
    pub market_down: Option<f64>,
    pub price_to_beat: Option<f64>,
    pub current_price: Option<f64>,
    pub regime: Option<String>,
    pub signal: Option<String>,
    pub recommendation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_directions_buy_their_outcome_token() {
        assert_eq!(Side::Up.exchange_side(), ExchangeSide::Buy);
        assert_eq!(Side::Down.exchange_side(), ExchangeSide::Buy);
    }

    #[test]
    fn expected_colors_follow_direction() {
        assert_eq!(Side::Up.expected_color(), "green");
        assert_eq!(Side::Down.expected_color(), "red");
    }
}
