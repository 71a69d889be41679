// src/handlers/product.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::Error as SqlxError;
use tracing::{error, instrument};

use crate::dtos::pagination::Pagination;
use crate::dtos::product::{CreateProductRequest, ProductResponse, UpdateProductRequest};
use crate::error::AppError;
use crate::models::product::Product;
use crate::state::AppState;

pub(crate) fn map_unique_violation(err: SqlxError, message: &str) -> AppError {
    match err {
        SqlxError::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            AppError::conflict(message)
        }
        other => other.into(),
    }
}

fn map_missing_reference(err: SqlxError, message: &str) -> AppError {
    match err {
        SqlxError::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
            AppError::not_found(message)
        }
        other => other.into(),
    }
}

const PRODUCT_SELECT: &str = "SELECT p.id, p.item_inventory_number, p.name, p.description,
                p.brand_id, b.name AS brand_name,
                p.category_id, c.name AS category_name,
                p.created_at, p.updated_at
         FROM products p
         LEFT JOIN brands b ON b.id = p.brand_id
         LEFT JOIN categories c ON c.id = p.category_id";

async fn fetch_product(state: &AppState, id: i64) -> Result<Option<Product>, SqlxError> {
    sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await
}

// GET /products - List products, paginated
#[instrument(skip(state))]
pub async fn get_products(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let (skip, limit) = page.bounds()?;
    match sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} ORDER BY p.id OFFSET $1 LIMIT $2"))
        .bind(skip)
        .bind(limit)
        .fetch_all(&state.db_pool)
        .await
    {
        Ok(products) => {
            let response = products.into_iter().map(ProductResponse::from).collect();
            Ok(Json(response))
        }
        Err(e) => {
            error!(?e, "Failed to fetch products");
            Err(e.into())
        }
    }
}

// GET /products/:id - Get single product
#[instrument(skip(state), fields(id))]
pub async fn get_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = fetch_product(&state, id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// POST /products - Create new product
#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let item = payload.item_inventory_number.trim();
    if item.is_empty() || item.chars().count() > 100 {
        return Err(AppError::validation(
            "item_inventory_number is required and must be at most 100 characters",
        ));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Product name is required"));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO products (item_inventory_number, name, description, brand_id, category_id)
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(item)
    .bind(payload.name.trim())
    .bind(payload.description.as_deref())
    .bind(payload.brand_id)
    .bind(payload.category_id)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| match e {
        SqlxError::Database(ref db_err) if db_err.code().as_deref() == Some("23503") => {
            AppError::not_found("Brand or category not found")
        }
        other => map_unique_violation(other, "Item inventory number already exists"),
    })?;

    let product = fetch_product(&state, id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

// PUT /products/:id - Update product
#[instrument(skip(state, payload), fields(id))]
pub async fn update_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::validation("Product name cannot be empty"));
    }

    let updated: Option<i64> = sqlx::query_scalar(
        "UPDATE products SET
         name = COALESCE($1, name),
         description = COALESCE($2, description),
         brand_id = COALESCE($3, brand_id),
         category_id = COALESCE($4, category_id),
         updated_at = NOW()
         WHERE id = $5 RETURNING id",
    )
    .bind(payload.name.as_deref().map(str::trim))
    .bind(payload.description.as_deref())
    .bind(payload.brand_id)
    .bind(payload.category_id)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await
    .map_err(|e| map_missing_reference(e, "Brand or category not found"))?;

    if updated.is_none() {
        return Err(AppError::not_found("Product not found"));
    }

    let product = fetch_product(&state, id)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;
    Ok(Json(ProductResponse::from(product)))
}

// DELETE /products/:id - Delete product with its inventory and sale
#[instrument(skip(state), fields(id))]
pub async fn delete_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.db_pool.begin().await?;

    sqlx::query("DELETE FROM sales WHERE product_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM inventory WHERE product_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Product not found"));
    }

    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
