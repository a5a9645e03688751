//! Application router configuration.

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;

use crate::{
    AppState,
    analytics::{get_bar_chart, get_pie_chart, get_statistics},
    endpoints,
    not_found::get_404_not_found,
    seed::seed_endpoint,
    transaction::list_transactions_endpoint,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::SEED, get(seed_endpoint))
        .route(endpoints::TRANSACTIONS, get(list_transactions_endpoint))
        .route(endpoints::STATISTICS, get(get_statistics))
        .route(endpoints::BAR_CHART, get(get_bar_chart))
        .route(endpoints::PIE_CHART, get(get_pie_chart))
        .fallback(get_404_not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
