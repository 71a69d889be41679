use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use sqlx::Error as SqlxError;
use tracing::{error, instrument};

use crate::dtos::pagination::Pagination;
use crate::dtos::sale::{CreateSaleRequest, SaleResponse};
use crate::error::AppError;
use crate::handlers::product::map_unique_violation;
use crate::models::sale::Sale;
use crate::state::AppState;

const SALE_SELECT: &str = "SELECT s.id, s.product_id, p.item_inventory_number, p.name AS product_name,
                s.quantity_sold,
                s.sell_price::FLOAT8          AS sell_price,
                s.gross_amount_earned::FLOAT8 AS gross_amount_earned,
                s.net_profit_loss::FLOAT8     AS net_profit_loss,
                s.percent_profit::FLOAT8      AS percent_profit,
                s.date_sold, s.days_held, s.comps, s.notes, s.created_at
         FROM sales s
         JOIN products p ON p.id = s.product_id";

#[instrument(skip(db_pool))]
pub async fn list_sales(
    State(AppState { db_pool }): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<SaleResponse>>, AppError> {
    let (skip, limit) = page.bounds()?;
    let sales = sqlx::query_as::<_, Sale>(&format!(
        "{SALE_SELECT} ORDER BY s.date_sold DESC NULLS LAST, s.id DESC OFFSET $1 LIMIT $2"
    ))
    .bind(skip)
    .bind(limit)
    .fetch_all(&db_pool)
    .await
    .map_err(|e| {
        error!(?e, "Failed to fetch sales");
        AppError::from(e)
    })?;

    Ok(Json(sales.into_iter().map(SaleResponse::from).collect()))
}

#[instrument(skip(db_pool, req), fields(product_id = req.product_id))]
pub async fn create_sale(
    State(AppState { db_pool }): State<AppState>,
    Json(req): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), AppError> {
    if req.sell_price <= 0.0 {
        return Err(AppError::validation("Sell price must be greater than 0"));
    }
    if req.quantity_sold <= 0 {
        return Err(AppError::validation("Quantity sold must be greater than 0"));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO sales
            (product_id, quantity_sold, sell_price, gross_amount_earned, net_profit_loss,
             percent_profit, date_sold, days_held, comps, notes)
         VALUES ($1, $2, $3::FLOAT8, $4::FLOAT8, $5::FLOAT8, $6::FLOAT8, $7, $8, $9, $10)
         RETURNING id",
    )
    .bind(req.product_id)
    .bind(req.quantity_sold)
    .bind(req.sell_price)
    .bind(req.gross_amount_earned)
    .bind(req.net_profit_loss)
    .bind(req.percent_profit)
    .bind(req.date_sold)
    .bind(req.days_held)
    .bind(req.comps.as_deref())
    .bind(req.notes.as_deref())
    .fetch_one(&db_pool)
    .await
    .map_err(|e| match e {
        SqlxError::Database(ref db_err) if db_err.code().as_deref() == Some("23503") => {
            AppError::not_found("Product not found")
        }
        other => map_unique_violation(other, "Product already has a sale record"),
    })?;

    let sale = sqlx::query_as::<_, Sale>(&format!("{SALE_SELECT} WHERE s.id = $1"))
        .bind(id)
        .fetch_one(&db_pool)
        .await?;

    Ok((StatusCode::CREATED, Json(SaleResponse::from(sale))))
}
