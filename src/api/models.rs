use crate::comparison::MatchedPair;
use crate::models::format_countdown;
use crate::refresh::{CycleStatus, RateRow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A matched pair with countdowns computed at request time.
#[derive(Debug, Serialize)]
pub struct PairView {
    #[serde(flatten)]
    pub pair: MatchedPair,
    pub countdown_a: String,
    pub countdown_b: String,
    pub material: bool,
}

impl PairView {
    pub fn new(pair: &MatchedPair, now: DateTime<Utc>, threshold: f64) -> Self {
        Self {
            countdown_a: format_countdown(now, pair.next_settlement_a),
            countdown_b: format_countdown(now, pair.next_settlement_b),
            material: pair.is_material(threshold),
            pair: pair.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RateRowView {
    #[serde(flatten)]
    pub row: RateRow,
    pub countdown: String,
}

/// Response for GET /status
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub generated_at: DateTime<Utc>,
    pub status: CycleStatus,
    pub counts: Vec<ExchangeCount>,
    pub matched: usize,
}

#[derive(Debug, Serialize)]
pub struct ExchangeCount {
    pub exchange: &'static str,
    pub count: usize,
}

/// Response for GET /comparison, /comparison/top and /comparison/bottom
#[derive(Debug, Serialize)]
pub struct ComparisonResponse {
    pub generated_at: DateTime<Utc>,
    pub status: CycleStatus,
    pub pairs: Vec<PairView>,
}

/// Response for GET /exchanges/{name}
#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub generated_at: DateTime<Utc>,
    pub exchange: &'static str,
    pub count: usize,
    pub rows: Vec<RateRowView>,
}

/// Query for the top/bottom slices
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}
