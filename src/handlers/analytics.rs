// src/handlers/analytics.rs
use axum::{extract::State, Json};
use tracing::{error, instrument};

use crate::dtos::analytics::{ProfitAnalysisResponse, TopProductsResponse};
use crate::error::AppError;
use crate::models::sale::{ProfitGroup, TopProduct};
use crate::state::AppState;

const TOP_LIMIT: i64 = 10;

const TOP_PRODUCT_SELECT: &str = "SELECT p.id AS product_id, p.item_inventory_number, p.name,
                b.name AS brand_name,
                s.sell_price::FLOAT8 AS sell_price,
                COALESCE(s.gross_amount_earned, s.sell_price * s.quantity_sold)::FLOAT8 AS revenue,
                s.net_profit_loss::FLOAT8 AS net_profit_loss,
                s.percent_profit::FLOAT8  AS percent_profit
         FROM sales s
         JOIN products p ON p.id = s.product_id
         LEFT JOIN brands b ON b.id = p.brand_id";

// GET /analytics/top-products - Best sellers by revenue and by margin
#[instrument(skip(state))]
pub async fn top_products(State(state): State<AppState>) -> Result<Json<TopProductsResponse>, AppError> {
    let by_revenue = sqlx::query_as::<_, TopProduct>(&format!(
        "{TOP_PRODUCT_SELECT} ORDER BY revenue DESC, p.id LIMIT $1"
    ))
    .bind(TOP_LIMIT)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        error!(?e, "Failed to rank products by revenue");
        AppError::from(e)
    })?;

    let by_margin = sqlx::query_as::<_, TopProduct>(&format!(
        "{TOP_PRODUCT_SELECT} WHERE s.percent_profit IS NOT NULL
         ORDER BY s.percent_profit DESC, p.id LIMIT $1"
    ))
    .bind(TOP_LIMIT)
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        error!(?e, "Failed to rank products by margin");
        AppError::from(e)
    })?;

    Ok(Json(TopProductsResponse {
        by_revenue: by_revenue.into_iter().map(Into::into).collect(),
        by_margin: by_margin.into_iter().map(Into::into).collect(),
    }))
}

fn profit_by(group_column: &str, fallback: &str, join: &str) -> String {
    format!(
        "SELECT COALESCE({group_column}, '{fallback}') AS name,
                COUNT(s.id) AS items_sold,
                COALESCE(SUM(COALESCE(s.gross_amount_earned, s.sell_price * s.quantity_sold)), 0)::FLOAT8 AS total_revenue,
                COALESCE(SUM(s.net_profit_loss), 0)::FLOAT8 AS total_profit,
                AVG(s.percent_profit)::FLOAT8 AS average_margin
         FROM sales s
         JOIN products p ON p.id = s.product_id
         {join}
         GROUP BY 1
         ORDER BY total_profit DESC, name"
    )
}

// GET /analytics/profit-analysis - Profit and margin per brand and per category
#[instrument(skip(state))]
pub async fn profit_analysis(
    State(state): State<AppState>,
) -> Result<Json<ProfitAnalysisResponse>, AppError> {
    let by_brand = sqlx::query_as::<_, ProfitGroup>(&profit_by(
        "b.name",
        "Unbranded",
        "LEFT JOIN brands b ON b.id = p.brand_id",
    ))
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        error!(?e, "Failed to aggregate profit by brand");
        AppError::from(e)
    })?;

    let by_category = sqlx::query_as::<_, ProfitGroup>(&profit_by(
        "c.name",
        "Uncategorized",
        "LEFT JOIN categories c ON c.id = p.category_id",
    ))
    .fetch_all(&state.db_pool)
    .await
    .map_err(|e| {
        error!(?e, "Failed to aggregate profit by category");
        AppError::from(e)
    })?;

    Ok(Json(ProfitAnalysisResponse {
        by_brand: by_brand.into_iter().map(Into::into).collect(),
        by_category: by_category.into_iter().map(Into::into).collect(),
    }))
}
