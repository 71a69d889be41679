use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

/// Sale row joined with the product sold.
#[derive(Debug, FromRow)]
pub struct Sale {
    pub id: i64,
    pub product_id: i64,
    pub item_inventory_number: String,
    pub product_name: String,
    pub quantity_sold: i32,
    pub sell_price: f64,
    pub gross_amount_earned: Option<f64>,
    pub net_profit_loss: Option<f64>,
    pub percent_profit: Option<f64>,
    pub date_sold: Option<NaiveDate>,
    pub days_held: Option<i32>,
    pub comps: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
pub struct TopProduct {
    pub product_id: i64,
    pub item_inventory_number: String,
    pub name: String,
    pub brand_name: Option<String>,
    pub sell_price: f64,
    pub revenue: f64,
    pub net_profit_loss: Option<f64>,
    pub percent_profit: Option<f64>,
}

#[derive(Debug, FromRow)]
pub struct ProfitGroup {
    pub name: String,
    pub items_sold: i64,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub average_margin: Option<f64>,
}
