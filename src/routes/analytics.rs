use axum::{routing::get, Router};
use crate::handlers::analytics::{profit_analysis, top_products};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analytics/top-products", get(top_products))
        .route("/analytics/profit-analysis", get(profit_analysis))
}
