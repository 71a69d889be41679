//! Phase-by-phase migration of a [`SourceTable`] into a [`Store`].

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

use super::brand::BrandResolver;
use super::source::{SourceError, SourceRow, SourceTable};
use super::transform;
use super::upsert::Upserter;
use crate::config::Config;
use crate::database;
use crate::store::{
    NaturalKey, NewBrand, NewCategory, NewProduct, NewRow, PgStore, Store, StoreError,
    TableCounts,
};

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("could not connect to the database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("could not apply the schema: {0}")]
    Schema(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Opens the pool, brings the schema up to date and wraps it in a [`PgStore`].
pub async fn connect(config: &Config) -> Result<PgStore, MigrateError> {
    let pool = database::create_pool(config)
        .await
        .map_err(MigrateError::Connect)?;
    database::run_migrations(&pool).await?;
    Ok(PgStore::new(pool))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Clear brands, products, inventory and sales, then load.
    #[default]
    Replace,
    /// Load on top of what is there; existing rows are left untouched.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Connecting,
    ClearingPriorData,
    MigratingBrands,
    MigratingCategories,
    MigratingProducts,
    MigratingInventory,
    MigratingSales,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connecting => "connecting",
            Phase::ClearingPriorData => "clearing prior data",
            Phase::MigratingBrands => "migrating brands",
            Phase::MigratingCategories => "migrating categories",
            Phase::MigratingProducts => "migrating products",
            Phase::MigratingInventory => "migrating inventory",
            Phase::MigratingSales => "migrating sales",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    pub created: usize,
    pub existing: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PhaseReport {
    fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Created => self.created += 1,
            RowOutcome::Existing => self.existing += 1,
            RowOutcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub mode: LoadMode,
    /// False when replace mode was asked for but clearing failed.
    pub cleared: bool,
    pub phases: Vec<(Phase, PhaseReport)>,
    /// Source records that could not be parsed into rows.
    pub unreadable_records: usize,
    pub counts: TableCounts,
}

impl MigrationReport {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|(p, _)| *p == phase).map(|(_, r)| r)
    }

    pub fn failed_rows(&self) -> usize {
        self.phases.iter().map(|(_, r)| r.failed).sum()
    }
}

#[derive(Debug, Clone)]
pub struct MigrateOptions {
    pub mode: LoadMode,
    pub batch_size: usize,
    pub resolver: BrandResolver,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            mode: LoadMode::Replace,
            batch_size: 10,
            resolver: BrandResolver::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Created,
    Existing,
    Skipped,
}

impl From<bool> for RowOutcome {
    fn from(created: bool) -> Self {
        if created {
            RowOutcome::Created
        } else {
            RowOutcome::Existing
        }
    }
}

/// Drives one migration run against `store`.
pub struct Migrator<'a, S: Store + ?Sized> {
    store: &'a mut S,
    options: MigrateOptions,
    upserter: Upserter,
}

impl<'a, S: Store + ?Sized> Migrator<'a, S> {
    pub fn new(store: &'a mut S, options: MigrateOptions) -> Self {
        Self {
            store,
            options,
            upserter: Upserter::new(),
        }
    }

    /// Runs every phase under the store's run lock. Row-level problems are
    /// counted in the report; only store failures outside a row end the run.
    pub async fn run(mut self, table: &SourceTable) -> Result<MigrationReport, MigrateError> {
        self.store.lock_run().await?;
        let result = self.run_phases(table).await;

        if result.is_err() {
            if let Err(e) = self.store.rollback().await {
                warn!(error = %e, "Rollback after failed run also failed");
            }
        }
        if let Err(e) = self.store.unlock_run().await {
            warn!(error = %e, "Failed to release the migration lock");
        }
        result
    }

    async fn run_phases(&mut self, table: &SourceTable) -> Result<MigrationReport, MigrateError> {
        if table.unreadable_records > 0 {
            warn!(records = table.unreadable_records, "Source had unreadable records");
        }

        let mut cleared = false;
        if self.options.mode == LoadMode::Replace {
            info!(phase = %Phase::ClearingPriorData, "Starting phase");
            match self.store.clear_all().await {
                Ok(()) => cleared = true,
                Err(e) => error!(error = %e, "Clearing prior data failed, continuing as append"),
            }
        }

        let mut phases = vec![Phase::MigratingBrands];
        if table.format.carries_categories() {
            phases.push(Phase::MigratingCategories);
        }
        phases.extend([
            Phase::MigratingProducts,
            Phase::MigratingInventory,
            Phase::MigratingSales,
        ]);

        let mut reports = Vec::with_capacity(phases.len());
        for phase in phases {
            let rows = match phase {
                Phase::MigratingCategories => table.category_rows.as_deref().unwrap_or(&table.rows),
                _ => table.rows.as_slice(),
            };
            let report = self.run_phase(phase, table, rows).await?;
            reports.push((phase, report));
        }

        let counts = self.store.counts().await?;
        info!(phase = %Phase::Done, %counts, "Migration finished");

        Ok(MigrationReport {
            mode: self.options.mode,
            cleared,
            phases: reports,
            unreadable_records: table.unreadable_records,
            counts,
        })
    }

    async fn run_phase(
        &mut self,
        phase: Phase,
        table: &SourceTable,
        rows: &[SourceRow],
    ) -> Result<PhaseReport, MigrateError> {
        info!(%phase, rows = rows.len(), "Starting phase");
        let batch_size = self.options.batch_size.max(1);
        let mut report = PhaseReport::default();
        let mut pending = 0;

        self.store.begin().await?;
        for row in rows {
            self.store.savepoint().await?;
            match self.migrate_row(phase, table, row).await {
                Ok(outcome) => {
                    self.store.release_savepoint().await?;
                    self.upserter.confirm();
                    report.record(outcome);
                    if outcome != RowOutcome::Skipped {
                        pending += 1;
                    }
                }
                Err(e) => {
                    let item = transform::item_number(row, table.fields());
                    warn!(
                        %phase,
                        item = item.as_deref().unwrap_or("<none>"),
                        line = row.line,
                        error = %e,
                        "Row failed, rolled back"
                    );
                    self.store.rollback_to_savepoint().await?;
                    self.store.release_savepoint().await?;
                    self.upserter.discard();
                    report.failed += 1;
                    pending += 1;
                }
            }

            if pending >= batch_size {
                self.commit_batch().await?;
                self.store.begin().await?;
                pending = 0;
            }
        }
        self.commit_batch().await?;

        info!(
            %phase,
            created = report.created,
            existing = report.existing,
            skipped = report.skipped,
            failed = report.failed,
            "Phase complete"
        );
        Ok(report)
    }

    async fn commit_batch(&mut self) -> Result<(), MigrateError> {
        if let Err(e) = self.store.commit().await {
            // The ids cached since the last commit may be gone.
            self.upserter.reset();
            return Err(e.into());
        }
        Ok(())
    }

    async fn migrate_row(
        &mut self,
        phase: Phase,
        table: &SourceTable,
        row: &SourceRow,
    ) -> Result<RowOutcome, StoreError> {
        let fields = table.fields();
        let store = &mut *self.store;
        let upserter = &mut self.upserter;

        match phase {
            Phase::MigratingBrands => {
                let Some(label) = transform::brand_label(row, fields, &self.options.resolver) else {
                    return Ok(RowOutcome::Skipped);
                };
                let up = upserter
                    .get_or_create(store, NewRow::Brand(NewBrand::named(label)))
                    .await?;
                Ok(up.created.into())
            }
            Phase::MigratingCategories => {
                let Some(label) = transform::category_label(row, fields) else {
                    return Ok(RowOutcome::Skipped);
                };
                let up = upserter
                    .get_or_create(store, NewRow::Category(NewCategory::named(label)))
                    .await?;
                Ok(up.created.into())
            }
            Phase::MigratingProducts => {
                let Some(draft) = transform::product_draft(row, fields) else {
                    return Ok(RowOutcome::Skipped);
                };
                let brand_id = match transform::brand_label(row, fields, &self.options.resolver) {
                    Some(label) => upserter.lookup(store, &NaturalKey::Brand(label)).await?,
                    None => None,
                };
                let category_id = match transform::category_label(row, fields) {
                    Some(label) => upserter.lookup(store, &NaturalKey::Category(label)).await?,
                    None => None,
                };
                let product = NewProduct {
                    item_inventory_number: draft.item_inventory_number,
                    name: draft.name,
                    description: draft.description,
                    brand_id,
                    category_id,
                };
                let up = upserter.get_or_create(store, NewRow::Product(product)).await?;
                Ok(up.created.into())
            }
            Phase::MigratingInventory => {
                let Some(product_id) = product_for(upserter, store, row, table).await? else {
                    return Ok(RowOutcome::Skipped);
                };
                let values = transform::inventory_values(row, fields, product_id);
                let up = upserter.get_or_create(store, NewRow::Inventory(values)).await?;
                Ok(up.created.into())
            }
            Phase::MigratingSales => {
                let Some(product_id) = product_for(upserter, store, row, table).await? else {
                    return Ok(RowOutcome::Skipped);
                };
                let Some(values) = transform::sale_values(row, fields, product_id) else {
                    return Ok(RowOutcome::Skipped);
                };
                let up = upserter.get_or_create(store, NewRow::Sale(values)).await?;
                Ok(up.created.into())
            }
            Phase::Connecting | Phase::ClearingPriorData | Phase::Done => Ok(RowOutcome::Skipped),
        }
    }
}

/// Id of the product the row's item number refers to, if it was migrated.
async fn product_for<S: Store + ?Sized>(
    upserter: &mut Upserter,
    store: &mut S,
    row: &SourceRow,
    table: &SourceTable,
) -> Result<Option<i64>, StoreError> {
    match transform::item_number(row, table.fields()) {
        Some(item) => upserter.lookup(store, &NaturalKey::Product(item)).await,
        None => Ok(None),
    }
}
