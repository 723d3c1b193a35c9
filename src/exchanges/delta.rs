use super::{Exchange, decimal};
use crate::comparison::ExchangeProfile;
use crate::config::Config;
use crate::errors::ExchangeError;
use crate::models::{FundingRates, RateObservation};
use crate::schedule::SettlementSchedule;
use crate::symbols::SymbolNormalizer;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

const PERPETUAL: &str = "perpetual_futures";

#[derive(Debug, Deserialize)]
struct TickersResponse {
    result: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct DeltaTicker {
    symbol: Option<String>,

    // percent, sent as a string on most tickers and as a number on some
    funding_rate: Option<Value>,

    contract_type: Option<String>,
}

pub struct Delta {
    client: reqwest::Client,
    url: String,
    profile: ExchangeProfile,
    schedule: SettlementSchedule,
}

impl Delta {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            url: config.delta_url.clone(),
            profile: Self::profile(),
            schedule: config.delta_schedule.clone(),
        }
    }

    /// Delta quotes perpetuals in USDT or USD and already reports percent.
    pub fn profile() -> ExchangeProfile {
        ExchangeProfile {
            name: "delta",
            normalizer: SymbolNormalizer::new(["USDT", "USD"]),
            rate_scale: 1.0,
        }
    }

    /// Parses a payload as if fetched at `now`: every row settles at the
    /// schedule's next slot after `now`.
    fn parse_at(&self, payload: Value, now: DateTime<Utc>) -> Result<FundingRates, ExchangeError> {
        parse_tickers(payload, self.schedule.next_after(now))
    }
}

/// Maps a tickers payload into funding rates. Delta does not report the next
/// funding time, so every entry gets `next_settlement`.
fn parse_tickers(
    payload: Value,
    next_settlement: DateTime<Utc>,
) -> Result<FundingRates, ExchangeError> {
    let response: TickersResponse = serde_json::from_value(payload)?;
    let mut rates = FundingRates::new();

    for item in response.result {
        let ticker: DeltaTicker = match serde_json::from_value(item) {
            Ok(ticker) => ticker,
            Err(e) => {
                tracing::debug!("[delta] skipping malformed ticker: {e}");
                continue;
            }
        };

        if ticker
            .contract_type
            .as_deref()
            .is_some_and(|kind| kind != PERPETUAL)
        {
            continue;
        }

        let Some(symbol) = ticker.symbol.filter(|s| !s.is_empty()) else {
            continue;
        };

        let Some(rate) = ticker.funding_rate.as_ref().and_then(decimal) else {
            tracing::debug!("[delta] {symbol} has no usable funding_rate");
            continue;
        };

        rates.insert(
            symbol,
            RateObservation {
                rate,
                next_settlement,
            },
        );
    }

    Ok(rates)
}

#[async_trait]
impl Exchange for Delta {
    fn name(&self) -> &'static str {
        self.profile.name
    }

    fn profile(&self) -> &ExchangeProfile {
        &self.profile
    }

    async fn fetch_funding_rates(&self) -> Result<FundingRates, ExchangeError> {
        let payload = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        self.parse_at(payload, Utc::now())
    }
}
