use luxx_inventory::etl::{latest_csv_in, BrandResolver, SourceSummary, SourceTable};

#[test]
fn analyze_reports_sales_totals() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.csv");
    std::fs::write(
        &path,
        "Item Inventory #,Brand + Product Name,Brand,seller, Sell price , Gross Amount Earned , Net Profit/Loss \n\
         1,Louis Vuitton Speedy,Louis Vuitton,ana,\"$1,100.00\",\"$1,000.00\",$400.00\n\
         2,Celine Belt Bag,Celine,ben,,,\n",
    )
    .unwrap();

    let table = SourceTable::load(&path, None).unwrap();
    let summary = SourceSummary::of(&table, &BrandResolver::default());

    assert_eq!(summary.records, 2);
    assert_eq!(summary.unique_brands, 2);
    assert_eq!(summary.sold_items, 1);
    assert_eq!(summary.total_revenue, 1000.0);
    assert_eq!(summary.total_profit, 400.0);
}

#[test]
fn latest_input_is_picked_from_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let older = dir.path().join("week-01.csv");
    let newer = dir.path().join("week-02.csv");
    std::fs::write(&older, "Item Inventory #\n").unwrap();
    std::fs::write(&newer, "Item Inventory #\n").unwrap();

    let past = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
    std::fs::File::options()
        .write(true)
        .open(&older)
        .unwrap()
        .set_modified(past)
        .unwrap();

    assert_eq!(latest_csv_in(dir.path()).unwrap(), newer);
}

#[test]
fn unknown_extension_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello").unwrap();
    assert!(SourceTable::load(&path, None).is_err());
}
