//! Spreadsheet/CSV ingestion: parse, normalize, resolve brands and load the
//! store phase by phase.

pub mod analyze;
pub mod backfill;
pub mod brand;
pub mod driver;
pub mod normalize;
pub mod source;
pub mod transform;
pub mod upsert;

pub use analyze::SourceSummary;
pub use backfill::{backfill_brands, BackfillReport};
pub use brand::{resolve_brand, BrandResolver, KNOWN_BRANDS};
pub use driver::{
    connect, LoadMode, MigrateError, MigrateOptions, MigrationReport, Migrator, Phase, PhaseReport,
};
pub use normalize::{format_money, normalize, parse_money};
pub use source::{latest_csv_in, Cell, SourceError, SourceFormat, SourceRow, SourceTable};
pub use upsert::{Upserted, Upserter};
