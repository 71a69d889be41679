//! Persistence seam for the migration tool.
//!
//! [`Store`] is the small set of operations the ETL needs: natural-key
//! lookups, insert-or-nothing inserts, explicit transactions with a single
//! row savepoint, and a process-wide run lock. [`PgStore`] backs it with
//! Postgres; [`MemoryStore`] applies the same constraints in memory and powers
//! dry runs and tests.

pub mod memory;
pub mod postgres;

pub use memory::{MemoryStore, Stored};
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("no open transaction")]
    NoTransaction,

    #[error("invalid store state: {0}")]
    InvalidState(String),

    #[error("another migration run holds the lock")]
    Locked,
}

impl StoreError {
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Brand,
    Category,
    Product,
    Inventory,
    Sale,
}

impl EntityKind {
    /// Children before parents.
    pub const CLEAR_ORDER: [EntityKind; 5] = [
        EntityKind::Sale,
        EntityKind::Inventory,
        EntityKind::Product,
        EntityKind::Category,
        EntityKind::Brand,
    ];

    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Brand => "brands",
            EntityKind::Category => "categories",
            EntityKind::Product => "products",
            EntityKind::Inventory => "inventory",
            EntityKind::Sale => "sales",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Business identity of a row. Inventory and sales are keyed by the product
/// they belong to (one of each per item).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NaturalKey {
    Brand(String),
    Category(String),
    Product(String),
    Inventory(i64),
    Sale(i64),
}

impl NaturalKey {
    pub fn kind(&self) -> EntityKind {
        match self {
            NaturalKey::Brand(_) => EntityKind::Brand,
            NaturalKey::Category(_) => EntityKind::Category,
            NaturalKey::Product(_) => EntityKind::Product,
            NaturalKey::Inventory(_) => EntityKind::Inventory,
            NaturalKey::Sale(_) => EntityKind::Sale,
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NaturalKey::Brand(name) => write!(f, "brand {name:?}"),
            NaturalKey::Category(name) => write!(f, "category {name:?}"),
            NaturalKey::Product(item) => write!(f, "product {item:?}"),
            NaturalKey::Inventory(product_id) => write!(f, "inventory for product {product_id}"),
            NaturalKey::Sale(product_id) => write!(f, "sale for product {product_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBrand {
    pub name: String,
    pub description: Option<String>,
}

impl NewBrand {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let description = Some(format!("Brand: {name}"));
        Self { name, description }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

impl NewCategory {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let description = Some(format!("Category for {name}"));
        Self { name, description }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub item_inventory_number: String,
    pub name: String,
    pub description: Option<String>,
    pub brand_id: Option<i64>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewInventory {
    pub product_id: i64,
    pub quantity: i32,
    pub purchase_price: Option<f64>,
    pub goal_earnings: Option<f64>,
    pub floor_earnings: Option<f64>,
    pub need_to_make: Option<f64>,
    pub list_price: Option<f64>,
    pub is_listed: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewSale {
    pub product_id: i64,
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

#[derive(Debug, Clone, PartialEq)]
pub enum NewRow {
    Brand(NewBrand),
    Category(NewCategory),
    Product(NewProduct),
    Inventory(NewInventory),
    Sale(NewSale),
}

impl NewRow {
    pub fn key(&self) -> NaturalKey {
        match self {
            NewRow::Brand(b) => NaturalKey::Brand(b.name.clone()),
            NewRow::Category(c) => NaturalKey::Category(c.name.clone()),
            NewRow::Product(p) => NaturalKey::Product(p.item_inventory_number.clone()),
            NewRow::Inventory(i) => NaturalKey::Inventory(i.product_id),
            NewRow::Sale(s) => NaturalKey::Sale(s.product_id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub brands: i64,
    pub categories: i64,
    pub products: i64,
    pub inventory: i64,
    pub sales: i64,
}

impl fmt::Display for TableCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "brands={} categories={} products={} inventory={} sales={}",
            self.brands, self.categories, self.products, self.inventory, self.sales
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnbrandedProduct {
    pub id: i64,
    pub name: String,
}

/// Operations the migration driver runs against the relational store.
///
/// Writes happen inside an explicit transaction opened with [`Store::begin`];
/// each source row additionally runs inside the single row savepoint so one
/// bad row can be undone without losing the rest of the batch.
#[async_trait]
pub trait Store: Send {
    /// Takes the exclusive run lock, failing with [`StoreError::Locked`] when
    /// any run holds it, this store's own included.
    async fn lock_run(&mut self) -> Result<(), StoreError>;
    async fn unlock_run(&mut self) -> Result<(), StoreError>;

    async fn begin(&mut self) -> Result<(), StoreError>;
    async fn commit(&mut self) -> Result<(), StoreError>;
    async fn rollback(&mut self) -> Result<(), StoreError>;

    async fn savepoint(&mut self) -> Result<(), StoreError>;
    async fn release_savepoint(&mut self) -> Result<(), StoreError>;
    /// Undoes the row's writes. The savepoint stays open until released.
    async fn rollback_to_savepoint(&mut self) -> Result<(), StoreError>;

    /// Deletes every row of [`EntityKind::CLEAR_ORDER`] in one transaction of
    /// its own. Must not be called with a transaction open.
    async fn clear_all(&mut self) -> Result<(), StoreError>;

    /// Exact natural-key lookup. Sees uncommitted rows of the open transaction.
    async fn find_id(&mut self, key: &NaturalKey) -> Result<Option<i64>, StoreError>;

    /// Inserts the row unless its natural key is already taken, in which case
    /// nothing is written and `None` comes back.
    async fn insert(&mut self, row: &NewRow) -> Result<Option<i64>, StoreError>;

    async fn unbranded_products(&mut self) -> Result<Vec<UnbrandedProduct>, StoreError>;
    async fn set_product_brand(&mut self, product_id: i64, brand_id: i64)
        -> Result<(), StoreError>;

    async fn counts(&mut self) -> Result<TableCounts, StoreError>;
}
