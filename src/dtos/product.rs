// src/dtos/product.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub item_inventory_number: String,
    pub name: String,
    pub description: Option<String>,
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub item_inventory_number: String,
    pub name: String,
    pub description: Option<String>,
    pub brand_id: Option<i64>,
    pub brand_name: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

// Convert from Model to Response DTO
impl From<crate::models::product::Product> for ProductResponse {
    fn from(product: crate::models::product::Product) -> Self {
        Self {
            id: product.id,
            item_inventory_number: product.item_inventory_number,
            name: product.name,
            description: product.description,
            brand_id: product.brand_id,
            brand_name: product.brand_name,
            category_id: product.category_id,
            category_name: product.category_name,
            created_at: product.created_at.map(|dt| dt.to_rfc3339()),
            updated_at: product.updated_at.map(|dt| dt.to_rfc3339()),
        }
    }
}
