pub mod advice;
pub mod sales;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Reference data
        .route("/api/calendar", get(sales::calendar))
        .route("/api/hierarchy", get(sales::hierarchy))
        // Working set
        .route("/api/rows", get(sales::rows))
        .route("/api/rows/:id/points", get(sales::points))
        .route("/api/store-counts", get(sales::store_counts))
        .route("/api/store-counts", post(sales::update_store_count))
        .route("/api/plan", post(sales::update_plan))
        // Windowed views
        .route("/api/sales", get(sales::window))
        .route("/api/sales/export.csv", get(sales::export_csv))
        .route("/api/summary", get(sales::summary))
        // Advisory text
        .route("/api/advice/planning", post(advice::planning))
        .route("/api/advice/analysis", post(advice::analysis))
        // Health check
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "OK"
}
