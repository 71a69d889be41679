use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity_sold: i32,
    pub sell_price: f64,
    pub gross_amount_earned: Option<f64>,
    pub net_profit_loss: Option<f64>,
    pub percent_profit: Option<f64>,
    pub date_sold: Option<NaiveDate>,
    pub days_held: Option<i32>,
    pub comps: Option<String>,
    pub notes: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
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
    pub created_at: Option<String>,
}

impl From<crate::models::sale::Sale> for SaleResponse {
    fn from(sale: crate::models::sale::Sale) -> Self {
        Self {
            id: sale.id,
            product_id: sale.product_id,
            item_inventory_number: sale.item_inventory_number,
            product_name: sale.product_name,
            quantity_sold: sale.quantity_sold,
            sell_price: sale.sell_price,
            gross_amount_earned: sale.gross_amount_earned,
            net_profit_loss: sale.net_profit_loss,
            percent_profit: sale.percent_profit,
            date_sold: sale.date_sold,
            days_held: sale.days_held,
            comps: sale.comps,
            notes: sale.notes,
            created_at: sale.created_at.map(|dt| dt.to_rfc3339()),
        }
    }
}
