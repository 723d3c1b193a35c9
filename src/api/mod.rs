pub mod handlers;
pub mod models;
pub mod router;

use crate::config::Config;
use crate::refresh::{RefreshCycle, ReportStore};
use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: ReportStore,
    /// Also driven by the timer loop; `POST /refresh` runs it on demand.
    pub cycle: Arc<RefreshCycle>,
    pub top_n: usize,
    pub threshold: f64,
}

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    pub fn new(store: ReportStore, cycle: Arc<RefreshCycle>, config: &Config) -> Self {
        Self {
            state: AppState {
                store,
                cycle,
                top_n: config.top_n,
                threshold: config.materiality_threshold,
            },
        }
    }

    /// Binds the server to the configured port and serves until `shutdown` resolves.
    pub async fn run<F>(self, config: &Config, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // the Prometheus recorder is process-global, so it is only installed here
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        let app = router::build(self.state)
            .route("/metrics", get(move || async move { metric_handle.render() }))
            .layer(prometheus_layer);
        let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));

        tracing::info!("API server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::ComparisonEngine;
    use crate::exchanges::binance::Binance;
    use crate::exchanges::delta::Delta;
    use crate::exchanges::testing::StubExchange;
    use crate::models::{FundingRates, RateObservation};
    use crate::refresh::RefreshReport;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use chrono::{TimeDelta, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    fn rates(entries: &[(&str, f64)]) -> FundingRates {
        let next = Utc::now() + TimeDelta::hours(2) + TimeDelta::minutes(30);
        entries
            .iter()
            .map(|&(sym, rate)| {
                (
                    sym.to_string(),
                    RateObservation {
                        rate,
                        next_settlement: next,
                    },
                )
            })
            .collect()
    }

    fn stub_cycle(binance: Option<FundingRates>, delta: Option<FundingRates>) -> Arc<RefreshCycle> {
        Arc::new(RefreshCycle::new(
            Box::new(StubExchange {
                profile: Binance::profile(),
                rates: binance,
            }),
            Box::new(StubExchange {
                profile: Delta::profile(),
                rates: delta,
            }),
            0.01,
        ))
    }

    fn empty_state() -> AppState {
        AppState {
            store: ReportStore::new(),
            cycle: stub_cycle(None, None),
            top_n: 5,
            threshold: 0.01,
        }
    }

    fn state(binance: &[(&str, f64)], delta: &[(&str, f64)]) -> AppState {
        let store = ReportStore::new();
        store.publish(RefreshReport::build(
            &ComparisonEngine::new(Binance::profile(), Delta::profile()),
            &rates(binance),
            &rates(delta),
            0.01,
            Utc::now(),
        ));

        AppState {
            store,
            cycle: stub_cycle(None, None),
            top_n: 2,
            threshold: 0.01,
        }
    }

    fn populated() -> AppState {
        state(
            &[("BTCUSDT", 0.0001), ("ETHUSDT", 0.0002), ("SOLUSDT", -0.0003)],
            &[("BTCUSD", 0.05), ("ETHUSD", 0.0), ("SOLUSD", 0.0)],
        )
    }

    async fn send(state: AppState, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router::build(state).oneshot(request).await.unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
        send(state, "GET", uri).await
    }

    fn symbols(body: &Value) -> Vec<&str> {
        body["pairs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["canonical_symbol"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn health_is_ok_before_first_cycle() {
        let state = empty_state();

        let response = router::build(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn data_routes_are_unavailable_before_first_cycle() {
        let state = empty_state();

        let (status, body) = get(state, "/comparison").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn comparison_is_ranked_with_countdowns() {
        let (status, body) = get(populated(), "/comparison").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"]["state"], "ready");
        assert_eq!(symbols(&body), ["BTC", "SOL", "ETH"]);

        let btc = &body["pairs"][0];
        assert_eq!(btc["source_a_symbol"], "BTCUSDT");
        assert_eq!(btc["material"], true);
        assert!(btc["countdown_a"].as_str().unwrap().starts_with("2h"));
    }

    #[tokio::test]
    async fn top_and_bottom_respect_limits() {
        let (_, top) = get(populated(), "/comparison/top").await;
        assert_eq!(symbols(&top), ["BTC", "SOL"]);

        let (_, bottom) = get(populated(), "/comparison/bottom?limit=1").await;
        assert_eq!(symbols(&bottom), ["ETH"]);
    }

    #[tokio::test]
    async fn single_pair_lookup_is_case_insensitive() {
        let (status, body) = get(populated(), "/comparison/eth").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source_b_symbol"], "ETHUSD");

        let (status, _) = get(populated(), "/comparison/DOGE").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn summary_and_status_reflect_report() {
        let (status, summary) = get(populated(), "/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["count"], 3);
        assert_eq!(summary["material_count"], 3);

        let (_, status_body) = get(populated(), "/status").await;
        assert_eq!(status_body["matched"], 3);
        assert_eq!(status_body["counts"][0]["exchange"], "binance");
        assert_eq!(status_body["counts"][1]["count"], 3);
    }

    #[tokio::test]
    async fn no_overlap_has_status_but_no_summary() {
        let no_overlap = || state(&[("BTCUSDT", 0.0001)], &[("ETHUSD", 0.01)]);

        let (_, status_body) = get(no_overlap(), "/status").await;
        assert_eq!(status_body["status"]["state"], "no_common_instruments");

        let (status, _) = get(no_overlap(), "/summary").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn exchange_view_lists_scaled_rates() {
        let (status, body) = get(populated(), "/exchanges/binance").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        assert_eq!(body["rows"][0]["symbol"], "ETHUSDT");

        let (status, _) = get(populated(), "/exchanges/bybit").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn manual_refresh_publishes_a_new_report() {
        let mut state = populated();
        state.cycle = stub_cycle(
            Some(rates(&[("BTCUSDT", 0.0001)])),
            Some(rates(&[("ETHUSD", 0.01)])),
        );

        let (status, body) = send(state.clone(), "POST", "/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"]["state"], "no_common_instruments");
        assert_eq!(body["matched"], 0);

        let (_, status_body) = get(state, "/status").await;
        assert_eq!(status_body["status"]["state"], "no_common_instruments");
        assert_eq!(status_body["counts"][1]["count"], 1);
    }

    #[tokio::test]
    async fn manual_refresh_works_before_first_timed_cycle() {
        let state = empty_state();

        let (status, body) = send(state.clone(), "POST", "/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"]["state"], "no_data");

        let (status, _) = get(state, "/comparison").await;
        assert_eq!(status, StatusCode::OK);
    }
}
