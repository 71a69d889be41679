// src/database.rs
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::Config;

/// Tables left over from the first schema draft. None of them hold brand,
/// product, inventory or sales rows.
pub const LEGACY_TABLES: &[&str] = &["order_items", "orders", "platform_goals", "admin_costs"];

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(config.database.clone())
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Schema is up to date");
    Ok(())
}

/// Drops [`LEGACY_TABLES`] in foreign-key order. Returns the tables dropped.
pub async fn drop_legacy_tables(pool: &PgPool) -> Result<Vec<&'static str>, sqlx::Error> {
    let mut dropped = Vec::new();
    for table in LEGACY_TABLES {
        let exists: Option<(String,)> = sqlx::query_as(
            "SELECT table_name::TEXT FROM information_schema.tables
             WHERE table_schema = 'public' AND table_name = $1",
        )
        .bind(*table)
        .fetch_optional(pool)
        .await?;

        if exists.is_none() {
            continue;
        }

        match sqlx::query(&format!("DROP TABLE IF EXISTS {table} CASCADE"))
            .execute(pool)
            .await
        {
            Ok(_) => {
                info!(table, "Dropped legacy table");
                dropped.push(*table);
            }
            Err(e) => warn!(table, error = %e, "Failed to drop legacy table"),
        }
    }
    Ok(dropped)
}
