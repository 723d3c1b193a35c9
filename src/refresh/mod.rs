pub mod store;

use crate::comparison::{ComparisonEngine, ComparisonResult, ExchangeProfile, SummaryStatistics};
use crate::exchanges::{Exchange, fetch_or_empty};
use crate::models::FundingRates;
use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::Serialize;
pub use store::ReportStore;

/// Outcome of a cycle as seen by a user. None of these are failures of the
/// service itself; they tell the caller what can be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CycleStatus {
    Ready,
    /// Neither exchange returned any data.
    NoData,
    /// Exactly one exchange returned nothing.
    MissingSource { exchange: &'static str },
    /// Both exchanges returned data but no symbol matched.
    NoCommonInstruments,
}

impl CycleStatus {
    pub fn classify(
        a: (&'static str, &FundingRates),
        b: (&'static str, &FundingRates),
        comparison: &ComparisonResult,
    ) -> Self {
        match (a.1.is_empty(), b.1.is_empty()) {
            (true, true) => Self::NoData,
            (true, false) => Self::MissingSource { exchange: a.0 },
            (false, true) => Self::MissingSource { exchange: b.0 },
            (false, false) if comparison.is_empty() => Self::NoCommonInstruments,
            (false, false) => Self::Ready,
        }
    }
}

/// A row of a single exchange's table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateRow {
    pub symbol: String,
    /// Percent, after the exchange's declared scaling.
    pub rate: f64,
    pub next_settlement: DateTime<Utc>,
}

/// One exchange's rates on their own, highest rate first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceView {
    pub exchange: &'static str,
    pub count: usize,
    pub rows: Vec<RateRow>,
}

impl SourceView {
    pub fn build(profile: &ExchangeProfile, rates: &FundingRates) -> Self {
        let mut rows: Vec<RateRow> = rates
            .iter()
            .map(|(symbol, obs)| RateRow {
                symbol: symbol.clone(),
                rate: profile.scaled(obs.rate),
                next_settlement: obs.next_settlement,
            })
            .collect();

        rows.sort_by_key(|r| std::cmp::Reverse(OrderedFloat(r.rate)));

        Self {
            exchange: profile.name,
            count: rows.len(),
            rows,
        }
    }
}

/// Everything one refresh cycle produced. Replaced wholesale by the next cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    pub generated_at: DateTime<Utc>,
    pub status: CycleStatus,
    pub sources: [SourceView; 2],
    pub comparison: ComparisonResult,
    pub summary: Option<SummaryStatistics>,
}

impl RefreshReport {
    pub fn build(
        engine: &ComparisonEngine,
        rates_a: &FundingRates,
        rates_b: &FundingRates,
        materiality_threshold: f64,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let (profile_a, profile_b) = engine.profiles();
        let comparison = engine.compare(rates_a, rates_b);
        let status = CycleStatus::classify(
            (profile_a.name, rates_a),
            (profile_b.name, rates_b),
            &comparison,
        );
        let summary = SummaryStatistics::from_result(&comparison, materiality_threshold);

        Self {
            generated_at,
            status,
            sources: [
                SourceView::build(profile_a, rates_a),
                SourceView::build(profile_b, rates_b),
            ],
            comparison,
            summary,
        }
    }

    pub fn source(&self, exchange: &str) -> Option<&SourceView> {
        self.sources
            .iter()
            .find(|s| s.exchange.eq_ignore_ascii_case(exchange))
    }
}

/// Fetches both exchanges concurrently, waits for both, and compares.
pub struct RefreshCycle {
    a: Box<dyn Exchange>,
    b: Box<dyn Exchange>,
    engine: ComparisonEngine,
    materiality_threshold: f64,
}

impl RefreshCycle {
    pub fn new(a: Box<dyn Exchange>, b: Box<dyn Exchange>, materiality_threshold: f64) -> Self {
        let engine = ComparisonEngine::new(a.profile().clone(), b.profile().clone());
        Self {
            a,
            b,
            engine,
            materiality_threshold,
        }
    }

    pub async fn run(&self) -> RefreshReport {
        let generated_at = Utc::now();

        // each side degrades to an empty mapping, so the join never short-circuits
        let (rates_a, rates_b) = futures_util::future::join(
            fetch_or_empty(self.a.as_ref()),
            fetch_or_empty(self.b.as_ref()),
        )
        .await;

        let report = RefreshReport::build(
            &self.engine,
            &rates_a,
            &rates_b,
            self.materiality_threshold,
            generated_at,
        );

        metrics::counter!("funding_refresh_total").increment(1);
        metrics::gauge!("funding_matched_pairs").set(report.comparison.len() as f64);

        match &report.status {
            CycleStatus::Ready => tracing::info!(
                "Compared {} vs {}: {} common instruments",
                self.a.name(),
                self.b.name(),
                report.comparison.len()
            ),
            CycleStatus::NoData => tracing::warn!("Could not fetch data from either exchange"),
            CycleStatus::MissingSource { exchange } => {
                tracing::warn!("[{exchange}] Could not fetch data")
            }
            CycleStatus::NoCommonInstruments => tracing::warn!(
                "No common symbols found between {} and {}",
                self.a.name(),
                self.b.name()
            ),
        }

        report
    }
}
