//! Source row to store row mapping.
//!
//! Every function here is pure: it reads one [`SourceRow`] through the
//! layout's [`FieldMap`] and returns the values to write, or `None` when the
//! row contributes nothing to that entity kind.

use super::brand::BrandResolver;
use super::normalize::{normalize, parse_date, parse_days, parse_flag, parse_percent, parse_whole};
use super::source::{FieldMap, SourceRow};
use crate::store::{NewInventory, NewSale};

#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub item_inventory_number: String,
    pub name: String,
    pub description: Option<String>,
}

pub fn item_number(row: &SourceRow, fields: &FieldMap) -> Option<String> {
    row.text(Some(fields.item_number))
}

/// The layout's brand column when it has one. Layouts without a brand column
/// (the inventory workbook) fall back to what the resolver makes of the
/// product name.
pub fn brand_label(row: &SourceRow, fields: &FieldMap, resolver: &BrandResolver) -> Option<String> {
    if fields.brand.is_some() {
        return row.text(fields.brand);
    }
    let name = row
        .text(fields.combined_name)
        .or_else(|| row.text(fields.product_name));
    resolver.resolve(name.as_deref())
}

pub fn category_label(row: &SourceRow, fields: &FieldMap) -> Option<String> {
    row.text(fields.category)
}

pub fn product_draft(row: &SourceRow, fields: &FieldMap) -> Option<ProductDraft> {
    let item_inventory_number = item_number(row, fields)?;
    let name = row
        .text(fields.combined_name)
        .or_else(|| row.text(fields.product_name))?;

    let description = match (row.text(fields.description), row.text(fields.quality)) {
        (Some(desc), Some(quality)) => Some(format!("{desc} Quality: {quality}")),
        (None, Some(quality)) => Some(format!("Quality: {quality}")),
        (desc, None) => desc,
    };

    Some(ProductDraft {
        item_inventory_number,
        name,
        description,
    })
}

pub fn inventory_values(row: &SourceRow, fields: &FieldMap, product_id: i64) -> NewInventory {
    // Layouts without a "listed" column only hold items that are up for sale.
    let is_listed = match fields.listed {
        Some(column) => parse_flag(row.get(Some(column))).unwrap_or(false),
        None => true,
    };

    NewInventory {
        product_id,
        quantity: 1,
        purchase_price: normalize(row.get(fields.purchase_price)),
        goal_earnings: normalize(row.get(fields.goal_earnings)),
        floor_earnings: normalize(row.get(fields.floor_earnings)),
        need_to_make: normalize(row.get(fields.need_to_make)),
        list_price: normalize(row.get(fields.list_price)),
        is_listed,
        notes: row.text(fields.notes),
    }
}

/// Sale values for the row, or `None` unless it records a sale: a positive
/// sell price and, where the layout tracks it, a positive quantity sold.
pub fn sale_values(row: &SourceRow, fields: &FieldMap, product_id: i64) -> Option<NewSale> {
    let sell_price = normalize(row.get(fields.sell_price)).filter(|p| *p > 0.0)?;
    let quantity_sold = match fields.quantity_sold {
        Some(column) => parse_whole(row.get(Some(column))).unwrap_or(0),
        None => 1,
    };
    if quantity_sold <= 0 {
        return None;
    }

    let notes = row
        .text(fields.seller)
        .map(|seller| format!("Seller: {seller}"))
        .or_else(|| row.text(fields.notes));

    Some(NewSale {
        product_id,
        quantity_sold,
        sell_price,
        gross_amount_earned: normalize(row.get(fields.gross_amount)),
        net_profit_loss: normalize(row.get(fields.net_profit)),
        percent_profit: parse_percent(row.get(fields.percent_profit)),
        date_sold: parse_date(row.get(fields.date_sold)),
        days_held: parse_days(row.get(fields.days_held)),
        comps: row.text(fields.comps),
        notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::source::{Cell, CSV_FIELDS, SPREADSHEET_FIELDS};
    use chrono::NaiveDate;

    fn csv_row(cells: &[(&str, &str)]) -> SourceRow {
        cells
            .iter()
            .fold(SourceRow::new(2), |row, (col, val)| row.with(col, Cell::from_text(val)))
    }

    #[test]
    fn csv_brand_comes_from_the_brand_column_only() {
        let resolver = BrandResolver::default();
        let row = csv_row(&[("Brand", "Coach"), ("Brand + Product Name", "Chanel Flap")]);
        assert_eq!(brand_label(&row, &CSV_FIELDS, &resolver).as_deref(), Some("Coach"));

        let row = csv_row(&[("Brand", "  "), ("Brand + Product Name", "Vintage Silk Scarf")]);
        assert_eq!(brand_label(&row, &CSV_FIELDS, &resolver), None);

        let row = csv_row(&[("Brand + Product Name", "Chanel Flap")]);
        assert_eq!(brand_label(&row, &CSV_FIELDS, &resolver), None);
    }

    #[test]
    fn spreadsheet_brand_comes_from_product_name() {
        let row = SourceRow::new(3).with("product name", Cell::from_text("Gucci Marmont"));
        assert_eq!(
            brand_label(&row, &SPREADSHEET_FIELDS, &BrandResolver::default()).as_deref(),
            Some("Gucci")
        );
    }

    #[test]
    fn product_needs_an_item_number_and_a_name() {
        let row = csv_row(&[("Item Inventory #", "LX-1")]);
        assert_eq!(product_draft(&row, &CSV_FIELDS), None);

        let row = csv_row(&[
            ("Item Inventory #", " LX-1 "),
            ("Product_Name", "Tote"),
            ("product description", "Black leather"),
            (" Quality ", "A"),
        ]);
        let draft = product_draft(&row, &CSV_FIELDS).unwrap();
        assert_eq!(draft.item_inventory_number, "LX-1");
        assert_eq!(draft.name, "Tote");
        assert_eq!(draft.description.as_deref(), Some("Black leather Quality: A"));
    }

    #[test]
    fn csv_inventory_defaults() {
        let row = csv_row(&[(" Purchase Price ", "N/A"), (" List Price ", "$250.00")]);
        let inv = inventory_values(&row, &CSV_FIELDS, 7);
        assert_eq!(inv.product_id, 7);
        assert_eq!(inv.quantity, 1);
        assert_eq!(inv.purchase_price, None);
        assert_eq!(inv.list_price, Some(250.0));
        assert!(inv.is_listed);
    }

    #[test]
    fn sale_gate() {
        let sold = csv_row(&[(" Sell price ", "$100.00"), ("Date Sold", "3/7/2025"), ("Percent Profit", "45%")]);
        let sale = sale_values(&sold, &CSV_FIELDS, 1).unwrap();
        assert_eq!(sale.sell_price, 100.0);
        assert_eq!(sale.quantity_sold, 1);
        assert_eq!(sale.date_sold, NaiveDate::from_ymd_opt(2025, 3, 7));
        assert_eq!(sale.percent_profit, Some(45.0));

        assert_eq!(sale_values(&csv_row(&[(" Sell price ", "")]), &CSV_FIELDS, 1), None);
        assert_eq!(sale_values(&csv_row(&[(" Sell price ", "$0.00")]), &CSV_FIELDS, 1), None);
        assert_eq!(sale_values(&csv_row(&[(" Sell price ", "($5.00)")]), &CSV_FIELDS, 1), None);
    }

    #[test]
    fn spreadsheet_sale_needs_quantity() {
        let row = SourceRow::new(4).with("Sell price", Cell::Number(80.0));
        assert_eq!(sale_values(&row, &SPREADSHEET_FIELDS, 1), None);

        let row = row.with("Quantity Sold", Cell::Number(1.0));
        assert_eq!(sale_values(&row, &SPREADSHEET_FIELDS, 1).map(|s| s.sell_price), Some(80.0));
    }
}
