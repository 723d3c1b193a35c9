use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One exchange's funding data for one raw symbol. The rate is in the
/// exchange's native unit; scaling happens in the comparison engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateObservation {
    pub rate: f64,
    pub next_settlement: DateTime<Utc>,
}

/// Raw exchange symbol → observation, as produced by one adapter in one cycle.
pub type FundingRates = BTreeMap<String, RateObservation>;

/// Signed percentage with six decimals, e.g. `+0.010000%`.
pub fn format_rate(rate: f64) -> String {
    // -0.0 would otherwise print as "+-0.000000%"
    let rate = if rate == 0.0 { 0.0 } else { rate };
    let sign = if rate >= 0.0 { "+" } else { "" };
    format!("{sign}{rate:.6}%")
}

/// Time left until `target`, clamped at zero: `"3h 05m"` or `"42m"`.
pub fn format_countdown(now: DateTime<Utc>, target: DateTime<Utc>) -> String {
    let secs = (target - now).num_seconds().max(0);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;

    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}
