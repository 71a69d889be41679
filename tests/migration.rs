use std::path::PathBuf;

use luxx_inventory::etl::{
    Cell, LoadMode, MigrateOptions, Migrator, Phase, PhaseReport, SourceFormat, SourceRow,
    SourceTable,
};
use luxx_inventory::store::{MemoryStore, TableCounts};

const HEADER: &str = "Item Inventory #,Brand + Product Name,Brand,Product_Name,product description, Quality , Purchase Price , List Price , Sell price , Gross Amount Earned , Net Profit/Loss ,Percent Profit,Date Sold,Days Held,seller";

fn write_csv(dir: &tempfile::TempDir, name: &str, rows: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    let mut body = String::from(HEADER);
    for row in rows {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    std::fs::write(&path, body).unwrap();
    path
}

fn three_row_export(dir: &tempfile::TempDir) -> PathBuf {
    write_csv(
        dir,
        "Platform Luxx Base Data.csv",
        &[
            "LX-001,Chanel Classic Flap,Chanel,,Black caviar,A,$50.00,$150.00,$100.00,$90.00,$40.00,80%,3/7/2025,12,ana",
            "LX-002,Vintage Silk Scarf,,,,,$10.00,$25.00,,,,,,,",
            "LX-003,Leather Wallet,,,,,N/A,$30.00,,,,,,,",
        ],
    )
}

fn options(mode: LoadMode) -> MigrateOptions {
    MigrateOptions {
        mode,
        ..MigrateOptions::default()
    }
}

#[tokio::test]
async fn three_row_export_loads_expected_entities() {
    let dir = tempfile::tempdir().unwrap();
    let table = SourceTable::load(&three_row_export(&dir), None).unwrap();
    assert_eq!(table.format, SourceFormat::Csv);

    let mut store = MemoryStore::new();
    let report = Migrator::new(&mut store, options(LoadMode::Replace))
        .run(&table)
        .await
        .unwrap();

    assert_eq!(
        report.counts,
        TableCounts { brands: 1, categories: 0, products: 3, inventory: 3, sales: 1 }
    );
    assert_eq!(report.failed_rows(), 0);

    let brands: Vec<_> = store.brands().iter().map(|b| b.row.name.as_str()).collect();
    assert_eq!(brands, vec!["Chanel"]);
    let chanel_id = store.brands()[0].id;

    let flap = &store.products()[0];
    assert_eq!(flap.row.item_inventory_number, "LX-001");
    assert_eq!(flap.row.brand_id, Some(chanel_id));
    assert_eq!(flap.row.description.as_deref(), Some("Black caviar Quality: A"));
    assert!(store.products()[1..].iter().all(|p| p.row.brand_id.is_none()));

    let wallet = store
        .products()
        .iter()
        .find(|p| p.row.item_inventory_number == "LX-003")
        .unwrap();
    let wallet_inventory = store
        .inventory()
        .iter()
        .find(|i| i.row.product_id == wallet.id)
        .unwrap();
    assert_eq!(wallet_inventory.row.purchase_price, None);
    assert_eq!(wallet_inventory.row.list_price, Some(30.0));

    let sale = &store.sales()[0].row;
    assert_eq!(sale.product_id, flap.id);
    assert_eq!(sale.sell_price, 100.0);
    assert_eq!(sale.net_profit_loss, Some(40.0));
    assert_eq!(sale.percent_profit, Some(80.0));
    assert_eq!(sale.days_held, Some(12));
    assert_eq!(sale.notes.as_deref(), Some("Seller: ana"));
}

#[tokio::test]
async fn replace_mode_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let table = SourceTable::load(&three_row_export(&dir), None).unwrap();
    let mut store = MemoryStore::new();

    let first = Migrator::new(&mut store, options(LoadMode::Replace))
        .run(&table)
        .await
        .unwrap();
    let second = Migrator::new(&mut store, options(LoadMode::Replace))
        .run(&table)
        .await
        .unwrap();

    assert_eq!(first.counts, second.counts);
    assert_eq!(second.phase(Phase::MigratingProducts).map(|r| r.created), Some(3));
}

#[tokio::test]
async fn append_mode_reuses_existing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let table = SourceTable::load(&three_row_export(&dir), None).unwrap();
    let mut store = MemoryStore::new();

    Migrator::new(&mut store, options(LoadMode::Append))
        .run(&table)
        .await
        .unwrap();
    let again = Migrator::new(&mut store, options(LoadMode::Append))
        .run(&table)
        .await
        .unwrap();

    assert!(!again.cleared);
    assert_eq!(again.counts.products, 3);
    assert_eq!(
        again.phase(Phase::MigratingProducts),
        Some(&PhaseReport { created: 0, existing: 3, skipped: 0, failed: 0 })
    );
    assert_eq!(again.phase(Phase::MigratingSales).map(|r| r.existing), Some(1));
}

#[tokio::test]
async fn bad_row_is_isolated_and_its_dependents_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let long_item = "X".repeat(120);
    let bad = format!("{long_item},Gucci Belt,,,,,$20.00,,$60.00,,,,,,");
    let path = write_csv(
        &dir,
        "export.csv",
        &[
            "G-1,Gucci Marmont,,,,,$300.00,,$500.00,,,,,,",
            bad.as_str(),
            "G-3,Gucci Loafers,,,,,$80.00,,,,,,,,",
        ],
    );
    let table = SourceTable::load(&path, None).unwrap();

    let mut store = MemoryStore::new();
    let report = Migrator::new(&mut store, options(LoadMode::Replace))
        .run(&table)
        .await
        .unwrap();

    assert_eq!(
        report.phase(Phase::MigratingProducts),
        Some(&PhaseReport { created: 2, existing: 0, skipped: 0, failed: 1 })
    );
    assert_eq!(report.phase(Phase::MigratingInventory).map(|r| r.skipped), Some(1));
    assert_eq!(report.counts.products, 2);
    assert_eq!(report.counts.inventory, 2);
    assert_eq!(report.counts.sales, 1);
}

#[tokio::test]
async fn rows_without_a_product_leave_no_inventory_or_sale() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "export.csv",
        &[
            "P-1,Prada Re-Edition,Prada,,,,$200.00,,$0.00,,,,,,",
            "P-2,,,,,,$10.00,,$45.00,,,,,,",
            ",Prada Galleria,,,,,$10.00,,$45.00,,,,,,",
        ],
    );
    let table = SourceTable::load(&path, None).unwrap();

    let mut store = MemoryStore::new();
    let report = Migrator::new(&mut store, options(LoadMode::Replace))
        .run(&table)
        .await
        .unwrap();

    assert_eq!(
        report.counts,
        TableCounts { brands: 1, categories: 0, products: 1, inventory: 1, sales: 0 }
    );
    assert_eq!(report.phase(Phase::MigratingSales).map(|r| r.skipped), Some(3));
}

#[tokio::test]
async fn duplicate_item_numbers_share_one_product() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "export.csv",
        &[
            "D-1,Dior Saddle,,,,,$900.00,,,,,,,,",
            "D-1,Dior Saddle (relisted),,,,,$950.00,,$1200.00,,,,,,",
        ],
    );
    let table = SourceTable::load(&path, None).unwrap();

    let mut store = MemoryStore::new();
    let report = Migrator::new(&mut store, options(LoadMode::Replace))
        .run(&table)
        .await
        .unwrap();

    assert_eq!(report.counts.products, 1);
    assert_eq!(report.counts.inventory, 1);
    assert_eq!(store.products()[0].row.name, "Dior Saddle");
    assert_eq!(store.inventory()[0].row.purchase_price, Some(900.0));
    assert_eq!(report.counts.sales, 1);
}

#[tokio::test]
async fn workbook_layout_links_categories() {
    let item = |line: usize, number: f64, name: &str, category: &str| {
        SourceRow::new(line)
            .with("Item Inventory #", Cell::Number(number))
            .with("product name", Cell::from_text(name))
            .with("product category", Cell::from_text(category))
            .with("Purchase Price", Cell::Number(120.0))
            .with("Listed?", Cell::from_text("Yes"))
    };
    let mut table = SourceTable::new(
        SourceFormat::spreadsheet(),
        vec![
            item(2, 1001.0, "Fendi Baguette", "Handbags")
                .with("Quantity Sold", Cell::Number(1.0))
                .with("Sell price", Cell::Number(400.0)),
            item(3, 1002.0, "Hermès Twilly", "Scarves"),
            item(4, 1003.0, "Tiffany Bracelet", "Jewelry").with("Sell price", Cell::Number(90.0)),
        ],
    );
    table.category_rows = Some(vec![
        SourceRow::new(2).with("product category", Cell::from_text("Handbags")),
        SourceRow::new(3).with("product category", Cell::from_text("Scarves")),
    ]);

    let mut store = MemoryStore::new();
    let report = Migrator::new(&mut store, options(LoadMode::Replace))
        .run(&table)
        .await
        .unwrap();

    assert_eq!(
        report.phase(Phase::MigratingCategories),
        Some(&PhaseReport { created: 2, existing: 0, skipped: 0, failed: 0 })
    );
    assert_eq!(
        report.counts,
        TableCounts { brands: 3, categories: 2, products: 3, inventory: 3, sales: 1 }
    );

    let products = store.products();
    assert_eq!(products[0].row.item_inventory_number, "1001");
    assert!(products[0].row.category_id.is_some());
    assert!(products[1].row.category_id.is_some());
    assert_eq!(products[2].row.category_id, None);
    assert!(store.inventory().iter().all(|i| i.row.is_listed));
}
