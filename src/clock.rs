//! Reference-timezone wall-clock helpers for the blocked-window gate.

use chrono::{DateTime, Timelike as _, Utc};
use chrono_tz::America::New_York;

/// Minutes since midnight in the US Eastern reference zone.
pub(crate) fn minutes_of_day_et(now: DateTime<Utc>) -> u32 {
    let local = now.with_timezone(&New_York);
    local.hour() * 60 + local.minute()
}

pub(crate) fn now_minutes_et() -> u32 {
    minutes_of_day_et(Utc::now())
}
