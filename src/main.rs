mod api;
mod comparison;
mod config;
mod errors;
mod exchanges;
mod models;
mod refresh;
mod schedule;
mod symbols;

use api::ApiServer;
use config::{Config, LogFormat};
use exchanges::binance::Binance;
use exchanges::delta::Delta;
use models::{format_countdown, format_rate};
use refresh::{RefreshCycle, RefreshReport, ReportStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn log_report(report: &RefreshReport, top_n: usize) {
    let now = chrono::Utc::now();

    for source in &report.sources {
        tracing::info!("[{}] {} instruments", source.exchange, source.count);
    }

    tracing::info!("=== TOP POSITIVE SPREADS ===");
    for pair in report.comparison.top(top_n) {
        tracing::info!(
            "{}: a={} b={} diff={} next a in {} / b in {}",
            pair.canonical_symbol,
            format_rate(pair.rate_a),
            format_rate(pair.rate_b),
            format_rate(pair.difference),
            format_countdown(now, pair.next_settlement_a),
            format_countdown(now, pair.next_settlement_b)
        );
    }

    tracing::info!("=== TOP NEGATIVE SPREADS ===");
    for pair in report.comparison.bottom(top_n) {
        tracing::info!(
            "{}: a={} b={} diff={}",
            pair.canonical_symbol,
            format_rate(pair.rate_a),
            format_rate(pair.rate_b),
            format_rate(pair.difference)
        );
    }

    if let Some(summary) = &report.summary {
        tracing::info!(
            "common={} avg={} max={} min={} opportunities={}",
            summary.count,
            format_rate(summary.mean),
            format_rate(summary.max),
            format_rate(summary.min),
            summary.material_count
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        "funding-spread starting: refresh every {:?}, API on port {}",
        config.refresh_interval,
        config.api_port
    );

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    // ── 1. Build the refresh cycle over both exchanges ────────────
    let cycle = Arc::new(RefreshCycle::new(
        Box::new(Binance::new(client.clone(), &config)),
        Box::new(Delta::new(client, &config)),
        config.materiality_threshold,
    ));
    let store = ReportStore::new();

    // ── 2. Spawn the refresh loop ──────────────────────────────────
    let loop_store = store.clone();
    let loop_cycle = Arc::clone(&cycle);
    let interval = config.refresh_interval;
    let top_n = config.top_n;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let report = loop_cycle.run().await;
            log_report(&report, top_n);
            loop_store.publish(report);
        }
    });

    // ── 3. Serve the API until Ctrl+C ──────────────────────────────
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutting down...");
    };

    ApiServer::new(store, cycle, &config).run(&config, shutdown).await
}
