use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Inventory row joined with the product it tracks.
#[derive(Debug, FromRow)]
pub struct InventoryItem {
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
    pub created_at: Option<DateTime<Utc>>,
}
