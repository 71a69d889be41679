use async_trait::async_trait;

use super::{
    NaturalKey, NewBrand, NewCategory, NewInventory, NewProduct, NewRow, NewSale, Store,
    StoreError, TableCounts, UnbrandedProduct,
};

const MAX_ITEM_NUMBER_LEN: usize = 100;
const MAX_PRODUCT_NAME_LEN: usize = 500;
const MAX_LABEL_LEN: usize = 255;

/// Integer digits of `NUMERIC(12, 2)` money columns.
const MONEY_DIGITS: i32 = 10;
/// Integer digits of `NUMERIC(8, 2)` percent columns.
const PERCENT_DIGITS: i32 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub id: i64,
    pub row: T,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    brands: Vec<Stored<NewBrand>>,
    categories: Vec<Stored<NewCategory>>,
    products: Vec<Stored<NewProduct>>,
    inventory: Vec<Stored<NewInventory>>,
    sales: Vec<Stored<NewSale>>,
}

/// Where a transaction or savepoint started. Rows are only ever appended,
/// so truncating to these lengths and restoring the brand links changed
/// since undoes everything after the mark. Ids are not reused, as with a
/// Postgres sequence.
#[derive(Debug, Default)]
struct Mark {
    brands: usize,
    categories: usize,
    products: usize,
    inventory: usize,
    sales: usize,
    relinked: Vec<(usize, Option<i64>)>,
}

impl Tables {
    fn mark(&self) -> Mark {
        Mark {
            brands: self.brands.len(),
            categories: self.categories.len(),
            products: self.products.len(),
            inventory: self.inventory.len(),
            sales: self.sales.len(),
            relinked: Vec::new(),
        }
    }

    fn undo(&mut self, mark: &Mark) {
        for (idx, brand_id) in mark.relinked.iter().rev() {
            if let Some(product) = self.products.get_mut(*idx) {
                product.row.brand_id = *brand_id;
            }
        }
        self.brands.truncate(mark.brands);
        self.categories.truncate(mark.categories);
        self.products.truncate(mark.products);
        self.inventory.truncate(mark.inventory);
        self.sales.truncate(mark.sales);
    }

    fn find(&self, key: &NaturalKey) -> Option<i64> {
        match key {
            NaturalKey::Brand(name) => self.brands.iter().find(|b| &b.row.name == name).map(|b| b.id),
            NaturalKey::Category(name) => {
                self.categories.iter().find(|c| &c.row.name == name).map(|c| c.id)
            }
            NaturalKey::Product(item) => self
                .products
                .iter()
                .find(|p| &p.row.item_inventory_number == item)
                .map(|p| p.id),
            NaturalKey::Inventory(product_id) => self
                .inventory
                .iter()
                .find(|i| i.row.product_id == *product_id)
                .map(|i| i.id),
            NaturalKey::Sale(product_id) => self
                .sales
                .iter()
                .find(|s| s.row.product_id == *product_id)
                .map(|s| s.id),
        }
    }

    fn has_product(&self, id: i64) -> bool {
        self.products.iter().any(|p| p.id == id)
    }

    fn check(&self, row: &NewRow) -> Result<(), StoreError> {
        match row {
            NewRow::Brand(b) => check_len("brands.name", &b.name, MAX_LABEL_LEN),
            NewRow::Category(c) => check_len("categories.name", &c.name, MAX_LABEL_LEN),
            NewRow::Product(p) => {
                check_len(
                    "products.item_inventory_number",
                    &p.item_inventory_number,
                    MAX_ITEM_NUMBER_LEN,
                )?;
                check_len("products.name", &p.name, MAX_PRODUCT_NAME_LEN)?;
                if let Some(brand_id) = p.brand_id {
                    if !self.brands.iter().any(|b| b.id == brand_id) {
                        return Err(StoreError::constraint(format!(
                            "products.brand_id {brand_id} references no brand"
                        )));
                    }
                }
                if let Some(category_id) = p.category_id {
                    if !self.categories.iter().any(|c| c.id == category_id) {
                        return Err(StoreError::constraint(format!(
                            "products.category_id {category_id} references no category"
                        )));
                    }
                }
                Ok(())
            }
            NewRow::Inventory(i) => {
                if !self.has_product(i.product_id) {
                    return Err(StoreError::constraint(format!(
                        "inventory.product_id {} references no product",
                        i.product_id
                    )));
                }
                check_numeric("inventory.purchase_price", i.purchase_price, MONEY_DIGITS)?;
                check_numeric("inventory.goal_earnings", i.goal_earnings, MONEY_DIGITS)?;
                check_numeric("inventory.floor_earnings", i.floor_earnings, MONEY_DIGITS)?;
                check_numeric("inventory.need_to_make", i.need_to_make, MONEY_DIGITS)?;
                check_numeric("inventory.list_price", i.list_price, MONEY_DIGITS)
            }
            NewRow::Sale(s) => {
                if !self.has_product(s.product_id) {
                    return Err(StoreError::constraint(format!(
                        "sales.product_id {} references no product",
                        s.product_id
                    )));
                }
                check_numeric("sales.sell_price", Some(s.sell_price), MONEY_DIGITS)?;
                check_numeric("sales.gross_amount_earned", s.gross_amount_earned, MONEY_DIGITS)?;
                check_numeric("sales.net_profit_loss", s.net_profit_loss, MONEY_DIGITS)?;
                check_numeric("sales.percent_profit", s.percent_profit, PERCENT_DIGITS)
            }
        }
    }

    fn push(&mut self, row: &NewRow) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        match row {
            NewRow::Brand(b) => self.brands.push(Stored { id, row: b.clone() }),
            NewRow::Category(c) => self.categories.push(Stored { id, row: c.clone() }),
            NewRow::Product(p) => self.products.push(Stored { id, row: p.clone() }),
            NewRow::Inventory(i) => self.inventory.push(Stored { id, row: i.clone() }),
            NewRow::Sale(s) => self.sales.push(Stored { id, row: s.clone() }),
        }
        id
    }

    fn counts(&self) -> TableCounts {
        TableCounts {
            brands: self.brands.len() as i64,
            categories: self.categories.len() as i64,
            products: self.products.len() as i64,
            inventory: self.inventory.len() as i64,
            sales: self.sales.len() as i64,
        }
    }
}

fn check_len(column: &str, value: &str, max: usize) -> Result<(), StoreError> {
    if value.chars().count() > max {
        return Err(StoreError::constraint(format!(
            "value too long for {column} (max {max} characters)"
        )));
    }
    Ok(())
}

/// Postgres rounds to the column's two decimals before checking the
/// precision, so the rounded magnitude must stay below `10^digits`.
fn check_numeric(column: &str, value: Option<f64>, digits: i32) -> Result<(), StoreError> {
    let Some(value) = value else {
        return Ok(());
    };
    let rounded = (value * 100.0).round() / 100.0;
    if !rounded.is_finite() || rounded.abs() >= 10f64.powi(digits) {
        return Err(StoreError::constraint(format!(
            "numeric field overflow for {column} ({value})"
        )));
    }
    Ok(())
}

/// In-memory [`Store`] with the uniqueness, foreign-key, length and numeric
/// precision constraints of the Postgres schema.
///
/// Writes go straight into the tables; `begin` and `savepoint` only remember
/// where they started, and rolling back truncates to that point. The accessors
/// therefore show the rows of an open transaction too.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    tx: Option<Mark>,
    savepoint: Option<Mark>,
    locked: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn brands(&self) -> &[Stored<NewBrand>] {
        &self.tables.brands
    }

    pub fn categories(&self) -> &[Stored<NewCategory>] {
        &self.tables.categories
    }

    pub fn products(&self) -> &[Stored<NewProduct>] {
        &self.tables.products
    }

    pub fn inventory(&self) -> &[Stored<NewInventory>] {
        &self.tables.inventory
    }

    pub fn sales(&self) -> &[Stored<NewSale>] {
        &self.tables.sales
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn has_savepoint(&self) -> bool {
        self.savepoint.is_some()
    }

    fn require_tx(&self) -> Result<(), StoreError> {
        match self.tx {
            Some(_) => Ok(()),
            None => Err(StoreError::NoTransaction),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn lock_run(&mut self) -> Result<(), StoreError> {
        if self.locked {
            return Err(StoreError::Locked);
        }
        self.locked = true;
        Ok(())
    }

    async fn unlock_run(&mut self) -> Result<(), StoreError> {
        self.locked = false;
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        if self.tx.is_some() {
            return Err(StoreError::invalid_state("transaction already open"));
        }
        self.tx = Some(self.tables.mark());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.tx.take().ok_or(StoreError::NoTransaction)?;
        self.savepoint = None;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(mark) = self.tx.take() {
            self.tables.undo(&mark);
        }
        self.savepoint = None;
        Ok(())
    }

    async fn savepoint(&mut self) -> Result<(), StoreError> {
        self.require_tx()?;
        if self.savepoint.is_some() {
            return Err(StoreError::invalid_state("row savepoint already open"));
        }
        self.savepoint = Some(self.tables.mark());
        Ok(())
    }

    async fn release_savepoint(&mut self) -> Result<(), StoreError> {
        self.require_tx()?;
        self.savepoint
            .take()
            .map(|_| ())
            .ok_or_else(|| StoreError::invalid_state("no savepoint to release"))
    }

    /// Undoes the row but keeps the savepoint open, like `ROLLBACK TO`.
    async fn rollback_to_savepoint(&mut self) -> Result<(), StoreError> {
        self.require_tx()?;
        let mark = self
            .savepoint
            .as_mut()
            .ok_or_else(|| StoreError::invalid_state("no savepoint to roll back to"))?;
        self.tables.undo(mark);
        mark.relinked.clear();
        Ok(())
    }

    async fn clear_all(&mut self) -> Result<(), StoreError> {
        if self.tx.is_some() {
            return Err(StoreError::invalid_state("cannot clear inside an open transaction"));
        }
        self.tables = Tables {
            next_id: self.tables.next_id,
            ..Tables::default()
        };
        Ok(())
    }

    async fn find_id(&mut self, key: &NaturalKey) -> Result<Option<i64>, StoreError> {
        Ok(self.tables.find(key))
    }

    async fn insert(&mut self, row: &NewRow) -> Result<Option<i64>, StoreError> {
        self.require_tx()?;
        if self.tables.find(&row.key()).is_some() {
            return Ok(None);
        }
        self.tables.check(row)?;
        Ok(Some(self.tables.push(row)))
    }

    async fn unbranded_products(&mut self) -> Result<Vec<UnbrandedProduct>, StoreError> {
        Ok(self
            .tables
            .products
            .iter()
            .filter(|p| p.row.brand_id.is_none())
            .map(|p| UnbrandedProduct {
                id: p.id,
                name: p.row.name.clone(),
            })
            .collect())
    }

    async fn set_product_brand(
        &mut self,
        product_id: i64,
        brand_id: i64,
    ) -> Result<(), StoreError> {
        self.require_tx()?;
        if !self.tables.brands.iter().any(|b| b.id == brand_id) {
            return Err(StoreError::constraint(format!(
                "products.brand_id {brand_id} references no brand"
            )));
        }
        let idx = self
            .tables
            .products
            .iter()
            .position(|p| p.id == product_id)
            .ok_or_else(|| StoreError::constraint(format!("product {product_id} does not exist")))?;

        let previous = self.tables.products[idx].row.brand_id;
        for mark in self.tx.iter_mut().chain(self.savepoint.iter_mut()) {
            mark.relinked.push((idx, previous));
        }
        self.tables.products[idx].row.brand_id = Some(brand_id);
        Ok(())
    }

    async fn counts(&mut self) -> Result<TableCounts, StoreError> {
        Ok(self.tables.counts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(item: &str) -> NewRow {
        NewRow::Product(NewProduct {
            item_inventory_number: item.to_string(),
            name: format!("Item {item}"),
            description: None,
            brand_id: None,
            category_id: None,
        })
    }

    #[tokio::test]
    async fn insert_requires_a_transaction() {
        let mut store = MemoryStore::new();
        let err = store.insert(&product("A1")).await.unwrap_err();
        assert!(matches!(err, StoreError::NoTransaction));
    }

    #[tokio::test]
    async fn duplicate_natural_key_inserts_nothing() {
        let mut store = MemoryStore::new();
        store.begin().await.unwrap();
        assert!(store.insert(&product("A1")).await.unwrap().is_some());
        assert_eq!(store.insert(&product("A1")).await.unwrap(), None);
        store.commit().await.unwrap();
        assert_eq!(store.products().len(), 1);
    }

    #[tokio::test]
    async fn savepoint_rollback_keeps_earlier_rows() {
        let mut store = MemoryStore::new();
        store.begin().await.unwrap();
        store.insert(&product("A1")).await.unwrap();
        store.savepoint().await.unwrap();
        store.insert(&product("A2")).await.unwrap();
        store.rollback_to_savepoint().await.unwrap();
        store.commit().await.unwrap();

        let items: Vec<_> = store
            .products()
            .iter()
            .map(|p| p.row.item_inventory_number.as_str())
            .collect();
        assert_eq!(items, vec!["A1"]);
    }

    #[tokio::test]
    async fn rejects_dangling_references_and_long_keys() {
        let mut store = MemoryStore::new();
        store.begin().await.unwrap();

        let orphan = NewRow::Sale(NewSale {
            product_id: 42,
            quantity_sold: 1,
            sell_price: 10.0,
            ..NewSale::default()
        });
        assert!(matches!(store.insert(&orphan).await, Err(StoreError::Constraint(_))));

        let long_key = "X".repeat(MAX_ITEM_NUMBER_LEN + 1);
        assert!(matches!(store.insert(&product(&long_key)).await, Err(StoreError::Constraint(_))));
    }

    #[tokio::test]
    async fn one_row_savepoint_at_a_time() {
        let mut store = MemoryStore::new();
        store.begin().await.unwrap();
        store.savepoint().await.unwrap();
        assert!(matches!(store.savepoint().await, Err(StoreError::InvalidState(_))));

        store.rollback_to_savepoint().await.unwrap();
        assert!(store.has_savepoint());
        store.release_savepoint().await.unwrap();
        assert!(!store.has_savepoint());
        store.savepoint().await.unwrap();
    }

    #[tokio::test]
    async fn rollback_undoes_inserts_and_brand_links() {
        let mut store = MemoryStore::new();
        store.begin().await.unwrap();
        let product_id = store.insert(&product("A1")).await.unwrap().unwrap();
        store.commit().await.unwrap();

        store.begin().await.unwrap();
        let brand_id = store
            .insert(&NewRow::Brand(NewBrand::named("Celine")))
            .await
            .unwrap()
            .unwrap();
        store.set_product_brand(product_id, brand_id).await.unwrap();
        store.insert(&product("A2")).await.unwrap();
        store.rollback().await.unwrap();

        assert!(store.brands().is_empty());
        assert_eq!(store.products().len(), 1);
        assert_eq!(store.products()[0].row.brand_id, None);

        store.begin().await.unwrap();
        let next = store.insert(&product("A3")).await.unwrap().unwrap();
        assert!(next > brand_id);
    }

    #[tokio::test]
    async fn amounts_must_fit_their_numeric_columns() {
        let mut store = MemoryStore::new();
        store.begin().await.unwrap();
        let product_id = store.insert(&product("A1")).await.unwrap().unwrap();

        let sale = |sell_price: f64, percent_profit: Option<f64>| {
            NewRow::Sale(NewSale {
                product_id,
                quantity_sold: 1,
                sell_price,
                percent_profit,
                ..NewSale::default()
            })
        };
        assert!(matches!(
            store.insert(&sale(1e10, None)).await,
            Err(StoreError::Constraint(_))
        ));
        assert!(matches!(
            store.insert(&sale(10.0, Some(1_000_000.0))).await,
            Err(StoreError::Constraint(_))
        ));
        assert!(store.insert(&sale(9_999_999_999.99, Some(-999_999.99))).await.unwrap().is_some());

        let inventory = NewRow::Inventory(NewInventory {
            product_id,
            quantity: 1,
            list_price: Some(f64::INFINITY),
            ..NewInventory::default()
        });
        assert!(matches!(store.insert(&inventory).await, Err(StoreError::Constraint(_))));
    }

    #[tokio::test]
    async fn run_lock_is_exclusive() {
        let mut store = MemoryStore::new();
        store.lock_run().await.unwrap();
        assert!(matches!(store.lock_run().await, Err(StoreError::Locked)));
        store.unlock_run().await.unwrap();
        assert!(!store.is_locked());
    }
}
