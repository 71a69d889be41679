// src/handlers/brand.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, instrument};

use crate::dtos::brand::{BrandResponse, CreateBrandRequest};
use crate::error::AppError;
use crate::handlers::product::map_unique_violation;
use crate::models::brand::Brand;
use crate::state::AppState;

const BRAND_COLUMNS: &str = "b.id, b.name, b.description, b.created_at,
        (SELECT COUNT(*) FROM products p WHERE p.brand_id = b.id) AS product_count";

// GET /brands - List all brands
#[instrument(skip(state))]
pub async fn get_brands(State(state): State<AppState>) -> Result<Json<Vec<BrandResponse>>, AppError> {
    match sqlx::query_as::<_, Brand>(&format!("SELECT {BRAND_COLUMNS} FROM brands b ORDER BY b.name"))
        .fetch_all(&state.db_pool)
        .await
    {
        Ok(brands) => Ok(Json(brands.into_iter().map(BrandResponse::from).collect())),
        Err(e) => {
            error!(?e, "Failed to fetch brands");
            Err(e.into())
        }
    }
}

// GET /brands/:id - Get single brand
#[instrument(skip(state), fields(id))]
pub async fn get_brand(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<BrandResponse>, AppError> {
    let brand = sqlx::query_as::<_, Brand>(&format!("SELECT {BRAND_COLUMNS} FROM brands b WHERE b.id = $1"))
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| AppError::not_found("Brand not found"))?;

    Ok(Json(BrandResponse::from(brand)))
}

// POST /brands - Create new brand
#[instrument(skip(state, payload))]
pub async fn create_brand(
    State(state): State<AppState>,
    Json(payload): Json<CreateBrandRequest>,
) -> Result<(StatusCode, Json<BrandResponse>), AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Brand name is required"));
    }
    if name.chars().count() > 255 {
        return Err(AppError::validation("Brand name must be at most 255 characters"));
    }

    let brand = sqlx::query_as::<_, Brand>(
        "INSERT INTO brands (name, description) VALUES ($1, $2)
         RETURNING id, name, description, created_at, 0::BIGINT AS product_count",
    )
    .bind(name)
    .bind(payload.description.as_deref())
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| map_unique_violation(e, "Brand name already exists"))?;

    Ok((StatusCode::CREATED, Json(BrandResponse::from(brand))))
}
