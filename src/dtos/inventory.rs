// src/dtos/inventory.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateInventoryRequest {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub purchase_price: Option<f64>,
    pub goal_earnings: Option<f64>,
    pub floor_earnings: Option<f64>,
    pub need_to_make: Option<f64>,
    pub list_price: Option<f64>,
    #[serde(default)]
    pub is_listed: bool,
    pub notes: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    pub id: i64,
    pub product_id: i64,
    pub item_inventory_number: String,
    pub product_name: String,
    pub quantity: i32,
    pub purchase_price: Option<f64>,
    pub goal_earnings: Option<f64>,
    pub floor_earnings: Option<f64>,
    pub need_to_make: Option<f64>,
    pub list_price: Option<f64>,
    pub is_listed: bool,
    pub notes: Option<String>,
    pub created_at: Option<String>,
}

impl From<crate::models::inventory::InventoryItem> for InventoryResponse {
    fn from(item: crate::models::inventory::InventoryItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            item_inventory_number: item.item_inventory_number,
            product_name: item.product_name,
            quantity: item.quantity,
            purchase_price: item.purchase_price,
            goal_earnings: item.goal_earnings,
            floor_earnings: item.floor_earnings,
            need_to_make: item.need_to_make,
            list_price: item.list_price,
            is_listed: item.is_listed,
            notes: item.notes,
            created_at: item.created_at.map(|dt| dt.to_rfc3339()),
        }
    }
}
