//! `luxx-migrate`: loads spreadsheet/CSV exports into the inventory database
//! and carries the maintenance chores that go with it.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use std::path::{Path, PathBuf};
use tracing::info;

use luxx_inventory::config::Config;
use luxx_inventory::database;
use luxx_inventory::etl::{
    backfill_brands, connect, latest_csv_in, BrandResolver, LoadMode, MigrateOptions, Migrator,
    Phase, SourceFormat, SourceSummary, SourceTable,
};
use luxx_inventory::logging;
use luxx_inventory::store::{MemoryStore, Store};

#[derive(Debug, Parser)]
#[command(name = "luxx-migrate", version, about = "Inventory data migration tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a source file into the database.
    Migrate(MigrateArgs),
    /// Print headline numbers of a source file without loading it.
    Analyze(SourceArgs),
    /// Link unbranded products to a brand taken from their name.
    BackfillBrands,
    /// Drop tables left over from the first schema draft.
    CleanupLegacy,
    /// Print row counts per table.
    Counts,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Spreadsheet,
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// CSV export or inventory workbook.
    #[arg(long, required_unless_present = "inputs_dir", conflicts_with = "inputs_dir")]
    source: Option<PathBuf>,

    /// Use the most recently modified .csv in this directory.
    #[arg(long)]
    inputs_dir: Option<PathBuf>,

    /// Source layout; guessed from the file extension when omitted.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Workbook sheet holding the items.
    #[arg(long, default_value = luxx_inventory::etl::source::DEFAULT_SHEET)]
    sheet: String,
}

impl SourceArgs {
    fn path(&self) -> anyhow::Result<PathBuf> {
        match (&self.source, &self.inputs_dir) {
            (Some(path), _) => Ok(path.clone()),
            (None, Some(dir)) => {
                let path = latest_csv_in(dir)?;
                info!(path = %path.display(), "Picked latest input");
                Ok(path)
            }
            (None, None) => anyhow::bail!("either --source or --inputs-dir is required"),
        }
    }

    fn format(&self) -> Option<SourceFormat> {
        self.format.map(|format| match format {
            FormatArg::Csv => SourceFormat::Csv,
            FormatArg::Spreadsheet => SourceFormat::Spreadsheet {
                sheet: self.sheet.clone(),
            },
        })
    }

    fn load(&self) -> anyhow::Result<SourceTable> {
        let path = self.path()?;
        let format = self.format().or_else(|| detect_with_sheet(&path, &self.sheet));
        SourceTable::load(&path, format)
            .with_context(|| format!("failed to read source {}", path.display()))
    }
}

fn detect_with_sheet(path: &Path, sheet: &str) -> Option<SourceFormat> {
    match SourceFormat::detect(path)? {
        SourceFormat::Spreadsheet { .. } => Some(SourceFormat::Spreadsheet {
            sheet: sheet.to_string(),
        }),
        other => Some(other),
    }
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(flatten)]
    source: SourceArgs,

    #[arg(long, value_enum, default_value_t = LoadMode::Replace)]
    mode: LoadMode,

    /// Rows per commit; defaults to MIGRATION_BATCH_SIZE.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Run against an in-memory store and leave the database alone.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logging::init_tracing("luxx_inventory=info,luxx_migrate=info")?;

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Migrate(args) => migrate(&config, args).await,
        Command::Analyze(args) => {
            let table = args.load()?;
            let summary = SourceSummary::of(&table, &BrandResolver::default());
            println!("{summary}");
            Ok(())
        }
        Command::BackfillBrands => {
            let mut store = connect(&config).await?;
            let report = backfill_brands(&mut store, &BrandResolver::default()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::CleanupLegacy => {
            let store = connect(&config).await?;
            let dropped = database::drop_legacy_tables(store.pool()).await?;
            println!("Dropped {} legacy table(s): {}", dropped.len(), dropped.join(", "));
            Ok(())
        }
        Command::Counts => {
            let mut store = connect(&config).await?;
            println!("{}", store.counts().await?);
            Ok(())
        }
    }
}

async fn migrate(config: &Config, args: MigrateArgs) -> anyhow::Result<()> {
    // An unreadable source stops the run before any connection is made.
    let table = args.source.load()?;

    let options = MigrateOptions {
        mode: args.mode,
        batch_size: args.batch_size.unwrap_or(config.batch_size).max(1),
        resolver: BrandResolver::default(),
    };

    let report = if args.dry_run {
        info!("Dry run against an in-memory store");
        let mut store = MemoryStore::new();
        Migrator::new(&mut store, options).run(&table).await?
    } else {
        info!(phase = %Phase::Connecting, "Starting phase");
        let mut store = connect(config).await?;
        Migrator::new(&mut store, options).run(&table).await?
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
