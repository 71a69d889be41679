pub mod analytics;
pub mod brands;
pub mod inventory;
pub mod products;
pub mod sales;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(brands::routes())
        .merge(products::routes())
        .merge(inventory::routes())
        .merge(sales::routes())
        .merge(analytics::routes())
}
