use crate::schedule::SettlementSchedule;
use anyhow::Context;
use chrono::TimeDelta;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const BINANCE_URL: &str = "https://fapi.binance.com/fapi/v1/premiumIndex";
// one week; funding intervals are at most a few hours
const MAX_FALLBACK_HOURS: i64 = 168;
const DELTA_URL: &str = "https://api.india.delta.exchange/v2/tickers?contract_types=perpetual_futures";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_port: u16,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub binance_url: String,
    pub delta_url: String,
    pub delta_schedule: SettlementSchedule,
    /// Used for Binance entries that carry no next funding time.
    pub fallback_interval: TimeDelta,
    pub materiality_threshold: f64,
    pub top_n: usize,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the config from any variable lookup; unset variables take defaults.
    pub fn from_vars<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_port = parse_or(&lookup, "API_PORT", 3000u16)?;
        let refresh_secs = parse_or(&lookup, "REFRESH_INTERVAL_SECS", 60u64)?;
        let timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 10u64)?;
        let fallback_hours = parse_or(&lookup, "FALLBACK_INTERVAL_HOURS", 8i64)?;
        let materiality_threshold = parse_or(&lookup, "MATERIALITY_THRESHOLD", 0.01f64)?;
        let top_n = parse_or(&lookup, "TOP_N", 5usize)?;

        anyhow::ensure!(refresh_secs > 0, "REFRESH_INTERVAL_SECS must be positive");
        anyhow::ensure!(
            (1..=MAX_FALLBACK_HOURS).contains(&fallback_hours),
            "FALLBACK_INTERVAL_HOURS must be between 1 and {MAX_FALLBACK_HOURS}"
        );

        let hours = lookup("DELTA_SCHEDULE_HOURS")
            .unwrap_or_else(|| "0,8,16".to_string())
            .split(',')
            .map(|h| h.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .context("DELTA_SCHEDULE_HOURS must be a comma separated list of hours")?;
        let delta_schedule = SettlementSchedule::from_hours(&hours)
            .context("DELTA_SCHEDULE_HOURS is not a valid schedule")?;

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            api_port,
            refresh_interval: Duration::from_secs(refresh_secs),
            request_timeout: Duration::from_secs(timeout_secs),
            binance_url: lookup("BINANCE_URL").unwrap_or_else(|| BINANCE_URL.to_string()),
            delta_url: lookup("DELTA_URL").unwrap_or_else(|| DELTA_URL.to_string()),
            delta_schedule,
            fallback_interval: TimeDelta::hours(fallback_hours),
            materiality_threshold,
            top_n,
            log_format,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config(&[]).unwrap();

        assert_eq!(config.api_port, 3000);
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.binance_url, BINANCE_URL);
        assert_eq!(config.delta_url, DELTA_URL);
        assert_eq!(
            config.delta_schedule,
            SettlementSchedule::from_hours(&[0, 8, 16]).unwrap()
        );
        assert_eq!(config.fallback_interval, TimeDelta::hours(8));
        assert_eq!(config.materiality_threshold, 0.01);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("API_PORT", "8080"),
            ("REFRESH_INTERVAL_SECS", " 15 "),
            ("DELTA_SCHEDULE_HOURS", "4, 12, 20"),
            ("TOP_N", "10"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.refresh_interval, Duration::from_secs(15));
        assert_eq!(
            config.delta_schedule,
            SettlementSchedule::from_hours(&[4, 12, 20]).unwrap()
        );
        assert_eq!(config.top_n, 10);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(config(&[("API_PORT", "70000")]).is_err());
        assert!(config(&[("REFRESH_INTERVAL_SECS", "0")]).is_err());
        assert!(config(&[("DELTA_SCHEDULE_HOURS", "0,25")]).is_err());
        assert!(config(&[("DELTA_SCHEDULE_HOURS", "0,,8")]).is_err());
        assert!(config(&[("MATERIALITY_THRESHOLD", "lots")]).is_err());
    }

    #[test]
    fn fallback_interval_must_be_a_positive_week_or_less() {
        assert!(config(&[("FALLBACK_INTERVAL_HOURS", "10000000000000")]).is_err());
        assert!(config(&[("FALLBACK_INTERVAL_HOURS", "10000000000")]).is_err());
        assert!(config(&[("FALLBACK_INTERVAL_HOURS", "-8")]).is_err());
        assert!(config(&[("FALLBACK_INTERVAL_HOURS", "0")]).is_err());
        assert!(config(&[("FALLBACK_INTERVAL_HOURS", "169")]).is_err());

        let config = config(&[("FALLBACK_INTERVAL_HOURS", "168")]).unwrap();
        assert_eq!(config.fallback_interval, TimeDelta::hours(168));
    }
}
