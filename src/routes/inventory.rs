use axum::{routing::get, Router};
use crate::handlers::inventory::{create_inventory, get_inventory};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/inventory", get(get_inventory).post(create_inventory))
}
