use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use super::brand::BrandResolver;
use super::normalize::{format_money, normalize};
use super::source::SourceTable;
use super::transform;

/// Headline numbers of a source table, computed without touching the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceSummary {
    pub records: usize,
    pub unique_brands: usize,
    pub unique_sellers: usize,
    pub sold_items: usize,
    pub unsold_items: usize,
    pub total_revenue: f64,
    pub total_profit: f64,
}

impl SourceSummary {
    pub fn of(table: &SourceTable, resolver: &BrandResolver) -> Self {
        let fields = table.fields();
        let mut brands = BTreeSet::new();
        let mut sellers = BTreeSet::new();
        let mut summary = SourceSummary {
            records: table.len(),
            ..Self::default()
        };

        for row in &table.rows {
            if let Some(brand) = transform::brand_label(row, fields, resolver) {
                brands.insert(brand);
            }
            if let Some(seller) = row.text(fields.seller) {
                sellers.insert(seller);
            }

            if row.get(fields.sell_price).is_blank() {
                summary.unsold_items += 1;
                continue;
            }
            summary.sold_items += 1;
            summary.total_revenue += normalize(row.get(fields.gross_amount)).unwrap_or(0.0);
            summary.total_profit += normalize(row.get(fields.net_profit)).unwrap_or(0.0);
        }

        summary.unique_brands = brands.len();
        summary.unique_sellers = sellers.len();
        summary
    }
}

impl fmt::Display for SourceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total records:  {}", self.records)?;
        writeln!(f, "Unique brands:  {}", self.unique_brands)?;
        writeln!(f, "Unique sellers: {}", self.unique_sellers)?;
        writeln!(f, "Sold items:     {}", self.sold_items)?;
        writeln!(f, "Unsold items:   {}", self.unsold_items)?;
        writeln!(f, "Total revenue:  {}", format_money(self.total_revenue))?;
        write!(f, "Total profit:   {}", format_money(self.total_profit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "Item Inventory #,Brand + Product Name,Brand,seller, Sell price , Gross Amount Earned , Net Profit/Loss \n\
                       1,Chanel Flap,Chanel,ana,$500,$450.00,$150.00\n\
                       2,Vintage Boy Bag,,ana,,$999.00,$999.00\n\
                       3,Tote,Coach,ben,$80,$70.00,($10.00)\n";

    #[test]
    fn brands_from_the_column_and_totals_from_sold_rows() {
        let table = SourceTable::from_csv_reader(CSV.as_bytes()).unwrap();
        let summary = SourceSummary::of(&table, &BrandResolver::default());

        assert_eq!(summary.records, 3);
        assert_eq!(summary.unique_brands, 2);
        assert_eq!(summary.unique_sellers, 2);
        assert_eq!(summary.sold_items, 2);
        assert_eq!(summary.unsold_items, 1);
        assert_eq!(summary.total_revenue, 520.0);
        assert_eq!(summary.total_profit, 140.0);
        assert!(summary.to_string().contains("Total profit:   $140.00"));
    }
}
