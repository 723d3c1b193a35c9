use crate::comparison::ExchangeProfile;
use crate::errors::ExchangeError;
use crate::models::FundingRates;
use async_trait::async_trait;
use serde_json::Value;

pub mod binance;
pub mod delta;

#[async_trait]
pub trait Exchange: Send + Sync {
    fn name(&self) -> &'static str;

    /// Symbol normalization and rate scaling for this exchange.
    fn profile(&self) -> &ExchangeProfile;

    /// Fetches the current funding rate of every perpetual this exchange lists.
    async fn fetch_funding_rates(&self) -> Result<FundingRates, ExchangeError>;
}

/// Runs one fetch and absorbs any failure into an empty mapping, so a
/// refresh cycle always has something to compare.
pub async fn fetch_or_empty(exchange: &dyn Exchange) -> FundingRates {
    let name = exchange.name();

    match exchange.fetch_funding_rates().await {
        Ok(rates) => {
            tracing::info!("[{name}] fetched {} funding rates", rates.len());
            metrics::gauge!("funding_instruments", "exchange" => name).set(rates.len() as f64);
            rates
        }
        Err(e) => {
            tracing::error!("[{name}] Failed to fetch funding rates: {e}");
            metrics::counter!("funding_fetch_failures_total", "exchange" => name).increment(1);
            metrics::gauge!("funding_instruments", "exchange" => name).set(0.0);
            FundingRates::new()
        }
    }
}

/// Reads a decimal that exchanges send either as a string or a JSON number.
/// Non-finite values are rejected.
pub(crate) fn decimal(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };

    parsed.is_finite().then_some(parsed)
}
