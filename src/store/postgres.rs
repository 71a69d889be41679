use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryScalar;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};

use super::{
    EntityKind, NaturalKey, NewRow, Store, StoreError, TableCounts, UnbrandedProduct,
};

/// Advisory lock key shared by every migration run ("LUXX").
const RUN_LOCK_KEY: i64 = 0x4C55_5858;

const ROW_SAVEPOINT: &str = "migrate_row";

/// [`Store`] over a Postgres pool.
///
/// Writes go through one pool-owned transaction at a time. The run lock is a
/// session-level advisory lock held on a separate pooled connection for as
/// long as the run lasts.
pub struct PgStore {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    lock_conn: Option<PoolConnection<Postgres>>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tx: None,
            lock_conn: None,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        self.tx.as_mut().ok_or(StoreError::NoTransaction)
    }

    async fn exec_in_tx(&mut self, sql: &str) -> Result<(), StoreError> {
        let tx = self.tx()?;
        sqlx::query(sql).execute(&mut **tx).await?;
        Ok(())
    }
}

fn find_query(key: &NaturalKey) -> QueryScalar<'_, Postgres, i64, PgArguments> {
    match key {
        NaturalKey::Brand(name) => {
            sqlx::query_scalar("SELECT id FROM brands WHERE name = $1").bind(name.as_str())
        }
        NaturalKey::Category(name) => {
            sqlx::query_scalar("SELECT id FROM categories WHERE name = $1").bind(name.as_str())
        }
        NaturalKey::Product(item) => {
            sqlx::query_scalar("SELECT id FROM products WHERE item_inventory_number = $1")
                .bind(item.as_str())
        }
        NaturalKey::Inventory(product_id) => {
            sqlx::query_scalar("SELECT id FROM inventory WHERE product_id = $1").bind(*product_id)
        }
        NaturalKey::Sale(product_id) => {
            sqlx::query_scalar("SELECT id FROM sales WHERE product_id = $1").bind(*product_id)
        }
    }
}

fn insert_query(row: &NewRow) -> QueryScalar<'_, Postgres, i64, PgArguments> {
    match row {
        NewRow::Brand(b) => sqlx::query_scalar(
            "INSERT INTO brands (name, description) VALUES ($1, $2)
             ON CONFLICT (name) DO NOTHING RETURNING id",
        )
        .bind(b.name.as_str())
        .bind(b.description.as_deref()),
        NewRow::Category(c) => sqlx::query_scalar(
            "INSERT INTO categories (name, description) VALUES ($1, $2)
             ON CONFLICT (name) DO NOTHING RETURNING id",
        )
        .bind(c.name.as_str())
        .bind(c.description.as_deref()),
        NewRow::Product(p) => sqlx::query_scalar(
            "INSERT INTO products (item_inventory_number, name, description, brand_id, category_id)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (item_inventory_number) DO NOTHING RETURNING id",
        )
        .bind(p.item_inventory_number.as_str())
        .bind(p.name.as_str())
        .bind(p.description.as_deref())
        .bind(p.brand_id)
        .bind(p.category_id),
        NewRow::Inventory(i) => sqlx::query_scalar(
            "INSERT INTO inventory
                (product_id, quantity, purchase_price, goal_earnings, floor_earnings,
                 need_to_make, list_price, is_listed, notes)
             VALUES ($1, $2, $3::FLOAT8, $4::FLOAT8, $5::FLOAT8, $6::FLOAT8, $7::FLOAT8, $8, $9)
             ON CONFLICT (product_id) DO NOTHING RETURNING id",
        )
        .bind(i.product_id)
        .bind(i.quantity)
        .bind(i.purchase_price)
        .bind(i.goal_earnings)
        .bind(i.floor_earnings)
        .bind(i.need_to_make)
        .bind(i.list_price)
        .bind(i.is_listed)
        .bind(i.notes.as_deref()),
        NewRow::Sale(s) => sqlx::query_scalar(
            "INSERT INTO sales
                (product_id, quantity_sold, sell_price, gross_amount_earned, net_profit_loss,
                 percent_profit, date_sold, days_held, comps, notes)
             VALUES ($1, $2, $3::FLOAT8, $4::FLOAT8, $5::FLOAT8, $6::FLOAT8, $7, $8, $9, $10)
             ON CONFLICT (product_id) DO NOTHING RETURNING id",
        )
        .bind(s.product_id)
        .bind(s.quantity_sold)
        .bind(s.sell_price)
        .bind(s.gross_amount_earned)
        .bind(s.net_profit_loss)
        .bind(s.percent_profit)
        .bind(s.date_sold)
        .bind(s.days_held)
        .bind(s.comps.as_deref())
        .bind(s.notes.as_deref()),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn lock_run(&mut self) -> Result<(), StoreError> {
        if self.lock_conn.is_some() {
            return Err(StoreError::Locked);
        }
        let mut conn = self.pool.acquire().await?;
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(RUN_LOCK_KEY)
            .fetch_one(&mut *conn)
            .await?;
        if !acquired {
            return Err(StoreError::Locked);
        }
        debug!(key = RUN_LOCK_KEY, "Took migration advisory lock");
        self.lock_conn = Some(conn);
        Ok(())
    }

    async fn unlock_run(&mut self) -> Result<(), StoreError> {
        if let Some(mut conn) = self.lock_conn.take() {
            sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(RUN_LOCK_KEY)
                .execute(&mut *conn)
                .await?;
            debug!(key = RUN_LOCK_KEY, "Released migration advisory lock");
        }
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        if self.tx.is_some() {
            return Err(StoreError::invalid_state("transaction already open"));
        }
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::NoTransaction)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    async fn savepoint(&mut self) -> Result<(), StoreError> {
        self.exec_in_tx(&format!("SAVEPOINT {ROW_SAVEPOINT}")).await
    }

    async fn release_savepoint(&mut self) -> Result<(), StoreError> {
        self.exec_in_tx(&format!("RELEASE SAVEPOINT {ROW_SAVEPOINT}")).await
    }

    async fn rollback_to_savepoint(&mut self) -> Result<(), StoreError> {
        self.exec_in_tx(&format!("ROLLBACK TO SAVEPOINT {ROW_SAVEPOINT}"))
            .await
    }

    async fn clear_all(&mut self) -> Result<(), StoreError> {
        if self.tx.is_some() {
            return Err(StoreError::invalid_state("cannot clear inside an open transaction"));
        }
        let mut tx = self.pool.begin().await?;
        for kind in EntityKind::CLEAR_ORDER {
            let result = sqlx::query(&format!("DELETE FROM {}", kind.table()))
                .execute(&mut *tx)
                .await?;
            info!(table = kind.table(), rows = result.rows_affected(), "Cleared table");
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_id(&mut self, key: &NaturalKey) -> Result<Option<i64>, StoreError> {
        let query = find_query(key);
        let id = match self.tx.as_mut() {
            Some(tx) => query.fetch_optional(&mut **tx).await?,
            None => query.fetch_optional(&self.pool).await?,
        };
        Ok(id)
    }

    async fn insert(&mut self, row: &NewRow) -> Result<Option<i64>, StoreError> {
        let query = insert_query(row);
        let tx = self.tx()?;
        Ok(query.fetch_optional(&mut **tx).await?)
    }

    async fn unbranded_products(&mut self) -> Result<Vec<UnbrandedProduct>, StoreError> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT id, name FROM products WHERE brand_id IS NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| UnbrandedProduct { id, name })
            .collect())
    }

    async fn set_product_brand(
        &mut self,
        product_id: i64,
        brand_id: i64,
    ) -> Result<(), StoreError> {
        let tx = self.tx()?;
        let result = sqlx::query(
            "UPDATE products SET brand_id = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(brand_id)
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::constraint(format!("product {product_id} does not exist")));
        }
        Ok(())
    }

    async fn counts(&mut self) -> Result<TableCounts, StoreError> {
        let (brands, categories, products, inventory, sales): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT
                    (SELECT COUNT(*) FROM brands),
                    (SELECT COUNT(*) FROM categories),
                    (SELECT COUNT(*) FROM products),
                    (SELECT COUNT(*) FROM inventory),
                    (SELECT COUNT(*) FROM sales)",
            )
            .fetch_one(&self.pool)
            .await?;
        Ok(TableCounts {
            brands,
            categories,
            products,
            inventory,
            sales,
        })
    }
}
