use super::ComparisonResult;
use serde::Serialize;

/// Scalar statistics over the spreads of one comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub count: usize,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    /// Pairs with `abs(difference) > threshold`.
    pub material_count: usize,
    pub threshold: f64,
}

impl SummaryStatistics {
    /// Returns `None` for an empty comparison: there is nothing to summarize.
    pub fn from_result(result: &ComparisonResult, threshold: f64) -> Option<Self> {
        if result.is_empty() {
            return None;
        }

        let diffs = result.pairs().iter().map(|p| p.difference);
        let count = result.len();
        let sum: f64 = diffs.clone().sum();
        let max = diffs.clone().fold(f64::NEG_INFINITY, f64::max);
        let min = diffs.fold(f64::INFINITY, f64::min);
        let material_count = result
            .pairs()
            .iter()
            .filter(|p| p.is_material(threshold))
            .count();

        Some(Self {
            count,
            mean: sum / count as f64,
            max,
            min,
            material_count,
            threshold,
        })
    }
}
