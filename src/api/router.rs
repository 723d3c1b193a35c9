use super::{AppState, handlers};
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the Axum router with all routes and shared state.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::get_status))
        .route("/refresh", post(handlers::post_refresh))
        .route("/summary", get(handlers::get_summary))
        .route("/comparison", get(handlers::get_comparison))
        .route("/comparison/top", get(handlers::get_top))
        .route("/comparison/bottom", get(handlers::get_bottom))
        .route("/comparison/{symbol}", get(handlers::get_pair))
        .route("/exchanges/{name}", get(handlers::get_exchange))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
