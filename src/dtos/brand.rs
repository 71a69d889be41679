// src/dtos/brand.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateBrandRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BrandResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub product_count: i64,
    pub created_at: Option<String>,
}

impl From<crate::models::brand::Brand> for BrandResponse {
    fn from(brand: crate::models::brand::Brand) -> Self {
        Self {
            id: brand.id,
            name: brand.name,
            description: brand.description,
            product_count: brand.product_count,
            created_at: brand.created_at.map(|dt| dt.to_rfc3339()),
        }
    }
}
