// src/handlers/inventory.rs
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use sqlx::Error as SqlxError;
use tracing::{error, instrument};

use crate::dtos::inventory::{CreateInventoryRequest, InventoryResponse};
use crate::dtos::pagination::Pagination;
use crate::error::AppError;
use crate::handlers::product::map_unique_violation;
use crate::models::inventory::InventoryItem;
use crate::state::AppState;

const INVENTORY_SELECT: &str = "SELECT i.id, i.product_id, p.item_inventory_number, p.name AS product_name,
                i.quantity,
                i.purchase_price::FLOAT8 AS purchase_price,
                i.goal_earnings::FLOAT8  AS goal_earnings,
                i.floor_earnings::FLOAT8 AS floor_earnings,
                i.need_to_make::FLOAT8   AS need_to_make,
                i.list_price::FLOAT8     AS list_price,
                i.is_listed, i.notes, i.created_at
         FROM inventory i
         JOIN products p ON p.id = i.product_id";

// GET /inventory - List inventory with product names, paginated
#[instrument(skip(state))]
pub async fn get_inventory(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<InventoryResponse>>, AppError> {
    let (skip, limit) = page.bounds()?;
    match sqlx::query_as::<_, InventoryItem>(&format!("{INVENTORY_SELECT} ORDER BY i.id OFFSET $1 LIMIT $2"))
        .bind(skip)
        .bind(limit)
        .fetch_all(&state.db_pool)
        .await
    {
        Ok(items) => Ok(Json(items.into_iter().map(InventoryResponse::from).collect())),
        Err(e) => {
            error!(?e, "Failed to fetch inventory");
            Err(e.into())
        }
    }
}

// POST /inventory - Create inventory record for a product
#[instrument(skip(state, payload), fields(product_id = payload.product_id))]
pub async fn create_inventory(
    State(state): State<AppState>,
    Json(payload): Json<CreateInventoryRequest>,
) -> Result<(StatusCode, Json<InventoryResponse>), AppError> {
    if payload.quantity < 0 {
        return Err(AppError::validation("Quantity cannot be negative"));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO inventory
            (product_id, quantity, purchase_price, goal_earnings, floor_earnings,
             need_to_make, list_price, is_listed, notes)
         VALUES ($1, $2, $3::FLOAT8, $4::FLOAT8, $5::FLOAT8, $6::FLOAT8, $7::FLOAT8, $8, $9)
         RETURNING id",
    )
    .bind(payload.product_id)
    .bind(payload.quantity)
    .bind(payload.purchase_price)
    .bind(payload.goal_earnings)
    .bind(payload.floor_earnings)
    .bind(payload.need_to_make)
    .bind(payload.list_price)
    .bind(payload.is_listed)
    .bind(payload.notes.as_deref())
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| match e {
        SqlxError::Database(ref db_err) if db_err.code().as_deref() == Some("23503") => {
            AppError::not_found("Product not found")
        }
        other => map_unique_violation(other, "Product already has an inventory record"),
    })?;

    let item = sqlx::query_as::<_, InventoryItem>(&format!("{INVENTORY_SELECT} WHERE i.id = $1"))
        .bind(id)
        .fetch_one(&state.db_pool)
        .await?;

    Ok((StatusCode::CREATED, Json(InventoryResponse::from(item))))
}
