use super::{Exchange, decimal};
use crate::comparison::ExchangeProfile;
use crate::config::Config;
use crate::errors::ExchangeError;
use crate::models::{FundingRates, RateObservation};
use crate::symbols::SymbolNormalizer;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use serde_json::Value;

/// One entry of Binance's premiumIndex array. Every field is optional;
/// entries without a usable symbol or rate are skipped.
#[derive(Debug, Deserialize)]
struct PremiumIndexEntry {
    symbol: Option<String>,

    #[serde(rename = "lastFundingRate")]
    last_funding_rate: Option<Value>,

    #[serde(rename = "nextFundingTime")]
    next_funding_time: Option<i64>,
}

pub struct Binance {
    client: reqwest::Client,
    url: String,
    profile: ExchangeProfile,
    fallback_interval: TimeDelta,
}

impl Binance {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            url: config.binance_url.clone(),
            profile: Self::profile(),
            fallback_interval: config.fallback_interval,
        }
    }

    /// USDⓈ-M perpetuals quote in USDT or BUSD; rates are fractions.
    pub fn profile() -> ExchangeProfile {
        ExchangeProfile {
            name: "binance",
            normalizer: SymbolNormalizer::new(["USDT", "BUSD"]),
            rate_scale: 100.0,
        }
    }
}

/// Maps a premiumIndex payload into funding rates. Entries whose symbol is
/// not a recognized perpetual, or whose rate is missing or unparseable, are
/// dropped. A missing (or zero) `nextFundingTime` becomes
/// `now + fallback_interval`.
fn parse_premium_index(
    payload: Value,
    normalizer: &SymbolNormalizer,
    now: DateTime<Utc>,
    fallback_interval: TimeDelta,
) -> Result<FundingRates, ExchangeError> {
    let Value::Array(items) = payload else {
        return Err(ExchangeError::UnexpectedData(
            "premiumIndex payload is not an array".to_string(),
        ));
    };

    let fallback = now.checked_add_signed(fallback_interval).ok_or_else(|| {
        ExchangeError::UnexpectedData(format!(
            "fallback interval {fallback_interval} overflows {now}"
        ))
    })?;
    let mut rates = FundingRates::new();

    for item in items {
        let entry: PremiumIndexEntry = match serde_json::from_value(item) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("[binance] skipping malformed entry: {e}");
                continue;
            }
        };

        let Some(symbol) = entry.symbol.filter(|s| normalizer.recognizes(s)) else {
            continue;
        };

        let Some(rate) = entry.last_funding_rate.as_ref().and_then(decimal) else {
            tracing::debug!("[binance] {symbol} has no usable lastFundingRate");
            continue;
        };

        let next_settlement = entry
            .next_funding_time
            .filter(|&ms| ms > 0)
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(fallback);

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
impl Exchange for Binance {
    fn name(&self) -> &'static str {
        self.profile.name
    }

    fn profile(&self) -> &ExchangeProfile {
        &self.profile
    }

    /// Pulls the premiumIndex for every symbol in one request.
    async fn fetch_funding_rates(&self) -> Result<FundingRates, ExchangeError> {
        let payload = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        parse_premium_index(
            payload,
            &self.profile.normalizer,
            Utc::now(),
            self.fallback_interval,
        )
    }
}
