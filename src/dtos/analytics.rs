use serde::Serialize;

use crate::models::sale::{ProfitGroup, TopProduct};

#[derive(Debug, Serialize)]
pub struct TopProductEntry {
    pub product_id: i64,
    pub item_inventory_number: String,
    pub name: String,
    pub brand: Option<String>,
    pub sell_price: f64,
    pub revenue: f64,
    pub net_profit_loss: Option<f64>,
    pub percent_profit: Option<f64>,
}

impl From<TopProduct> for TopProductEntry {
    fn from(p: TopProduct) -> Self {
        Self {
            product_id: p.product_id,
            item_inventory_number: p.item_inventory_number,
            name: p.name,
            brand: p.brand_name,
            sell_price: p.sell_price,
            revenue: p.revenue,
            net_profit_loss: p.net_profit_loss,
            percent_profit: p.percent_profit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TopProductsResponse {
    pub by_revenue: Vec<TopProductEntry>,
    pub by_margin: Vec<TopProductEntry>,
}

#[derive(Debug, Serialize)]
pub struct ProfitGroupEntry {
    pub name: String,
    pub items_sold: i64,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub average_margin: Option<f64>,
}

impl From<ProfitGroup> for ProfitGroupEntry {
    fn from(g: ProfitGroup) -> Self {
        Self {
            name: g.name,
            items_sold: g.items_sold,
            total_revenue: g.total_revenue,
            total_profit: g.total_profit,
            average_margin: g.average_margin,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfitAnalysisResponse {
    pub by_brand: Vec<ProfitGroupEntry>,
    pub by_category: Vec<ProfitGroupEntry>,
}
