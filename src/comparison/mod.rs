pub mod summary;

use crate::models::FundingRates;
use crate::symbols::SymbolNormalizer;
use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::collections::BTreeMap;
pub use summary::SummaryStatistics;

/// How one exchange's symbols and rates are brought onto the common scale.
/// Declared once per exchange, never inferred from the data.
#[derive(Debug, Clone)]
pub struct ExchangeProfile {
    pub name: &'static str,
    pub normalizer: SymbolNormalizer,
    /// Multiplier turning the native rate into a percentage
    /// (100 for fractional rates, 1 for rates already in percent).
    pub rate_scale: f64,
}

impl ExchangeProfile {
    pub fn scaled(&self, rate: f64) -> f64 {
        rate * self.rate_scale
    }
}

/// Two exchanges' observations of the same base asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPair {
    pub canonical_symbol: String,
    pub source_a_symbol: String,
    pub source_b_symbol: String,
    pub rate_a: f64,
    pub rate_b: f64,
    /// `rate_b - rate_a`, both in percent.
    pub difference: f64,
    pub next_settlement_a: DateTime<Utc>,
    pub next_settlement_b: DateTime<Utc>,
}

impl MatchedPair {
    pub fn is_material(&self, threshold: f64) -> bool {
        self.difference.abs() > threshold
    }
}

/// Matched pairs sorted by `difference`, largest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ComparisonResult {
    pairs: Vec<MatchedPair>,
}

impl ComparisonResult {
    pub fn pairs(&self) -> &[MatchedPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The `n` largest spreads.
    pub fn top(&self, n: usize) -> &[MatchedPair] {
        &self.pairs[..n.min(self.pairs.len())]
    }

    /// The `n` smallest spreads, most negative first.
    pub fn bottom(&self, n: usize) -> Vec<&MatchedPair> {
        self.pairs.iter().rev().take(n).collect()
    }

    pub fn get(&self, canonical_symbol: &str) -> Option<&MatchedPair> {
        self.pairs
            .iter()
            .find(|p| p.canonical_symbol == canonical_symbol)
    }
}

/// One side of the join after normalization.
struct Side<'a> {
    raw_symbol: &'a str,
    rate: f64,
    next_settlement: DateTime<Utc>,
    suffix_rank: Option<usize>,
}

/// Joins two exchanges' funding rates on canonical symbol and ranks the spreads.
#[derive(Debug, Clone)]
pub struct ComparisonEngine {
    a: ExchangeProfile,
    b: ExchangeProfile,
}

impl ComparisonEngine {
    pub fn new(a: ExchangeProfile, b: ExchangeProfile) -> Self {
        Self { a, b }
    }

    pub fn profiles(&self) -> (&ExchangeProfile, &ExchangeProfile) {
        (&self.a, &self.b)
    }

    pub fn compare(&self, rates_a: &FundingRates, rates_b: &FundingRates) -> ComparisonResult {
        let lookup_a = Self::lookup(&self.a, rates_a);
        let lookup_b = Self::lookup(&self.b, rates_b);

        // BTreeMap iteration keeps ties in alphabetical order after the stable sort
        let mut pairs: Vec<MatchedPair> = lookup_a
            .iter()
            .filter_map(|(key, side_a)| {
                let side_b = lookup_b.get(key)?;
                let rate_a = self.a.scaled(side_a.rate);
                let rate_b = self.b.scaled(side_b.rate);

                Some(MatchedPair {
                    canonical_symbol: key.clone(),
                    source_a_symbol: side_a.raw_symbol.to_string(),
                    source_b_symbol: side_b.raw_symbol.to_string(),
                    rate_a,
                    rate_b,
                    difference: rate_b - rate_a,
                    next_settlement_a: side_a.next_settlement,
                    next_settlement_b: side_b.next_settlement,
                })
            })
            .collect();

        pairs.sort_by_key(|p| std::cmp::Reverse(OrderedFloat(p.difference)));

        ComparisonResult { pairs }
    }

    /// Canonical key → observation. When two raw symbols collapse onto one
    /// key, the one matched by the earlier suffix wins, then the
    /// lexicographically smaller raw symbol.
    fn lookup<'a>(profile: &ExchangeProfile, rates: &'a FundingRates) -> BTreeMap<String, Side<'a>> {
        let mut lookup: BTreeMap<String, Side<'a>> = BTreeMap::new();

        for (raw, obs) in rates {
            let canonical = profile.normalizer.resolve(raw);
            let side = Side {
                raw_symbol: raw,
                rate: obs.rate,
                next_settlement: obs.next_settlement,
                suffix_rank: canonical.suffix_rank,
            };

            match lookup.get(&canonical.key) {
                Some(existing) if !outranks(side.suffix_rank, existing.suffix_rank) => {
                    tracing::debug!(
                        "[{}] {} shadowed by {} for key {}",
                        profile.name,
                        raw,
                        existing.raw_symbol,
                        canonical.key
                    );
                }
                _ => {
                    lookup.insert(canonical.key, side);
                }
            }
        }

        lookup
    }
}

// A matched suffix beats no match; an earlier suffix beats a later one.
fn outranks(candidate: Option<usize>, existing: Option<usize>) -> bool {
    match (candidate, existing) {
        (Some(c), Some(e)) => c < e,
        (Some(_), None) => true,
        _ => false,
    }
}
