use super::AppState;
use super::models::{
    ComparisonResponse, ExchangeCount, ExchangeResponse, LimitQuery, PairView, RateRowView,
    StatusResponse,
};
use crate::comparison::{MatchedPair, SummaryStatistics};
use crate::errors::ApiError;
use crate::models::format_countdown;
use crate::refresh::RefreshReport;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use std::sync::Arc;

fn latest(state: &AppState) -> Result<Arc<RefreshReport>, ApiError> {
    state.store.latest().ok_or(ApiError::NotReady)
}

fn comparison_response<'a>(
    report: &RefreshReport,
    pairs: impl IntoIterator<Item = &'a MatchedPair>,
    threshold: f64,
) -> ComparisonResponse {
    let now = Utc::now();
    ComparisonResponse {
        generated_at: report.generated_at,
        status: report.status.clone(),
        pairs: pairs
            .into_iter()
            .map(|p| PairView::new(p, now, threshold))
            .collect(),
    }
}

/// GET /health — simple liveness check
pub async fn health() -> &'static str {
    "OK"
}

fn status_response(report: &RefreshReport) -> StatusResponse {
    StatusResponse {
        generated_at: report.generated_at,
        status: report.status.clone(),
        counts: report
            .sources
            .iter()
            .map(|s| ExchangeCount {
                exchange: s.exchange,
                count: s.count,
            })
            .collect(),
        matched: report.comparison.len(),
    }
}

/// GET /status — cycle outcome and per-exchange counts
pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let report = latest(&state)?;
    Ok(Json(status_response(&report)))
}

/// POST /refresh — runs a cycle now and publishes it in place of the last one
pub async fn post_refresh(State(state): State<AppState>) -> Json<StatusResponse> {
    tracing::info!("Manual refresh requested");
    let report = state.cycle.run().await;
    let response = status_response(&report);
    state.store.publish(report);
    Json(response)
}

/// GET /comparison — every matched pair, largest spread first
pub async fn get_comparison(
    State(state): State<AppState>,
) -> Result<Json<ComparisonResponse>, ApiError> {
    let report = latest(&state)?;
    let pairs = report.comparison.pairs();
    Ok(Json(comparison_response(&report, pairs, state.threshold)))
}

/// GET /comparison/top?limit=N
pub async fn get_top(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ComparisonResponse>, ApiError> {
    let report = latest(&state)?;
    let n = query.limit.unwrap_or(state.top_n);
    Ok(Json(comparison_response(
        &report,
        report.comparison.top(n),
        state.threshold,
    )))
}

/// GET /comparison/bottom?limit=N — most negative spread first
pub async fn get_bottom(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ComparisonResponse>, ApiError> {
    let report = latest(&state)?;
    let n = query.limit.unwrap_or(state.top_n);
    Ok(Json(comparison_response(
        &report,
        report.comparison.bottom(n),
        state.threshold,
    )))
}

/// GET /comparison/{symbol} — one canonical symbol, e.g. BTC
pub async fn get_pair(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<PairView>, ApiError> {
    let report = latest(&state)?;
    let symbol = symbol.to_uppercase();

    report
        .comparison
        .get(&symbol)
        .map(|p| Json(PairView::new(p, Utc::now(), state.threshold)))
        .ok_or(ApiError::NotFound(symbol))
}

/// GET /summary
pub async fn get_summary(
    State(state): State<AppState>,
) -> Result<Json<SummaryStatistics>, ApiError> {
    let report = latest(&state)?;

    report
        .summary
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("summary".to_string()))
}

/// GET /exchanges/{name} — one exchange's rates on their own
pub async fn get_exchange(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ExchangeResponse>, ApiError> {
    let report = latest(&state)?;
    let source = report
        .source(&name)
        .ok_or_else(|| ApiError::NotFound(format!("exchange {name}")))?;
    let now = Utc::now();

    Ok(Json(ExchangeResponse {
        generated_at: report.generated_at,
        exchange: source.exchange,
        count: source.count,
        rows: source
            .rows
            .iter()
            .map(|row| RateRowView {
                countdown: format_countdown(now, row.next_settlement),
                row: row.clone(),
            })
            .collect(),
    }))
}
