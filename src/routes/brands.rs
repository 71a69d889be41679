use axum::{routing::get, Router};
use crate::handlers::brand::{create_brand, get_brand, get_brands};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/brands", get(get_brands).post(create_brand))
        .route("/brands/{id}", get(get_brand))
}
