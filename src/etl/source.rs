//! Tabular sources: the CSV export and the multi-sheet inventory workbook.
//!
//! Both layouts load into the same [`SourceTable`]; the column names each one
//! uses for a given field live in its [`FieldMap`].

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::normalize::{date_from_serial, parse_date_text};

type Workbook = Sheets<BufReader<File>>;

pub const DEFAULT_SHEET: &str = "Inventory";
pub const CATEGORY_SHEET: &str = "For Listing PM";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("sheet {0:?} not found in workbook")]
    MissingSheet(String),

    #[error("required column {0:?} not found")]
    MissingColumn(String),

    #[error("cannot tell the source format of {0}; use a .csv or spreadsheet file")]
    UnknownFormat(PathBuf),

    #[error("no .csv files in {0}")]
    NoInputs(PathBuf),
}

/// Column names a source layout uses. `None` means the layout has no such
/// column and the field falls back to its default.
#[derive(Debug)]
pub struct FieldMap {
    pub item_number: &'static str,
    pub combined_name: Option<&'static str>,
    pub brand: Option<&'static str>,
    pub product_name: Option<&'static str>,
    pub description: Option<&'static str>,
    pub quality: Option<&'static str>,
    pub category: Option<&'static str>,
    pub purchase_price: Option<&'static str>,
    pub list_price: Option<&'static str>,
    pub goal_earnings: Option<&'static str>,
    pub floor_earnings: Option<&'static str>,
    pub need_to_make: Option<&'static str>,
    pub listed: Option<&'static str>,
    pub notes: Option<&'static str>,
    pub quantity_sold: Option<&'static str>,
    pub sell_price: Option<&'static str>,
    pub gross_amount: Option<&'static str>,
    pub net_profit: Option<&'static str>,
    pub percent_profit: Option<&'static str>,
    pub date_sold: Option<&'static str>,
    pub days_held: Option<&'static str>,
    pub comps: Option<&'static str>,
    pub seller: Option<&'static str>,
}

// Several CSV headers carry the padding spaces of the original export.
pub static CSV_FIELDS: FieldMap = FieldMap {
    item_number: "Item Inventory #",
    combined_name: Some("Brand + Product Name"),
    brand: Some("Brand"),
    product_name: Some("Product_Name"),
    description: Some("product description"),
    quality: Some(" Quality "),
    category: None,
    purchase_price: Some(" Purchase Price "),
    list_price: Some(" List Price "),
    goal_earnings: None,
    floor_earnings: None,
    need_to_make: None,
    listed: None,
    notes: None,
    quantity_sold: None,
    sell_price: Some(" Sell price "),
    gross_amount: Some(" Gross Amount Earned "),
    net_profit: Some(" Net Profit/Loss "),
    percent_profit: Some("Percent Profit"),
    date_sold: Some("Date Sold"),
    days_held: Some("Days Held"),
    comps: None,
    seller: Some("seller"),
};

pub static SPREADSHEET_FIELDS: FieldMap = FieldMap {
    item_number: "Item Inventory #",
    combined_name: None,
    brand: None,
    product_name: Some("product name"),
    description: Some("product description"),
    quality: None,
    category: Some("product category"),
    purchase_price: Some("Purchase Price"),
    list_price: Some("List Price"),
    goal_earnings: Some("Goal earnings"),
    floor_earnings: Some("Floor Earnings"),
    need_to_make: Some("Need to Make"),
    listed: Some("Listed?"),
    notes: Some("Notes"),
    quantity_sold: Some("Quantity Sold"),
    sell_price: Some("Sell price"),
    gross_amount: Some("Gross Amount Earned"),
    net_profit: Some("Net Profit/Loss"),
    percent_profit: Some("Percent Profit"),
    date_sold: Some("Date Sold"),
    days_held: Some("Days Held"),
    comps: Some("Comps"),
    seller: None,
};

/// Layout of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFormat {
    /// Single-table CSV export, one row per item.
    Csv,
    /// Inventory workbook; items live on `sheet`, categories on
    /// [`CATEGORY_SHEET`] when present.
    Spreadsheet { sheet: String },
}

impl SourceFormat {
    pub fn spreadsheet() -> Self {
        SourceFormat::Spreadsheet {
            sheet: DEFAULT_SHEET.to_string(),
        }
    }

    /// Guesses the layout from the file extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(SourceFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceFormat::spreadsheet()),
            _ => None,
        }
    }

    pub fn fields(&self) -> &'static FieldMap {
        match self {
            SourceFormat::Csv => &CSV_FIELDS,
            SourceFormat::Spreadsheet { .. } => &SPREADSHEET_FIELDS,
        }
    }

    pub fn carries_categories(&self) -> bool {
        self.fields().category.is_some()
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Csv => f.write_str("csv"),
            SourceFormat::Spreadsheet { sheet } => write!(f, "spreadsheet ({sheet})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    pub fn from_text(raw: &str) -> Self {
        if raw.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    /// Trimmed text of the cell, `None` when blank. Whole numbers print
    /// without a trailing `.0` so numeric item numbers stay stable keys.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            Cell::Empty => return None,
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }

    pub fn is_blank(&self) -> bool {
        self.as_text().is_none()
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::from_text(s),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => date_from_serial(dt.as_f64())
                .map(Cell::Date)
                .unwrap_or(Cell::Number(dt.as_f64())),
            Data::DateTimeIso(s) => parse_date_text(s)
                .map(Cell::Date)
                .unwrap_or_else(|| Cell::from_text(s)),
            Data::DurationIso(s) => Cell::from_text(s),
        }
    }
}

static EMPTY: Cell = Cell::Empty;

/// One data row, keyed by the exact header text of the source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceRow {
    /// 1-based line (CSV) or row (sheet) number in the source file.
    pub line: usize,
    pub cells: HashMap<String, Cell>,
}

impl SourceRow {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            cells: HashMap::new(),
        }
    }

    pub fn with(mut self, column: &str, value: Cell) -> Self {
        self.cells.insert(column.to_string(), value);
        self
    }

    pub fn get(&self, column: Option<&str>) -> &Cell {
        column
            .and_then(|c| self.cells.get(c))
            .unwrap_or(&EMPTY)
    }

    pub fn text(&self, column: Option<&str>) -> Option<String> {
        self.get(column).as_text()
    }
}

/// A whole source file held in memory.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub format: SourceFormat,
    pub rows: Vec<SourceRow>,
    /// Rows of the category sheet, when the layout has one and it exists.
    pub category_rows: Option<Vec<SourceRow>>,
    /// Records the reader could not parse at all; they never become rows.
    pub unreadable_records: usize,
}

impl SourceTable {
    pub fn new(format: SourceFormat, rows: Vec<SourceRow>) -> Self {
        Self {
            format,
            rows,
            category_rows: None,
            unreadable_records: 0,
        }
    }

    pub fn fields(&self) -> &'static FieldMap {
        self.format.fields()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Loads `path` using `format`, or the format implied by its extension.
    pub fn load(path: &Path, format: Option<SourceFormat>) -> Result<Self, SourceError> {
        let format = match format {
            Some(format) => format,
            None => SourceFormat::detect(path)
                .ok_or_else(|| SourceError::UnknownFormat(path.to_path_buf()))?,
        };

        let table = match &format {
            SourceFormat::Csv => {
                let file = File::open(path).map_err(|source| SourceError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_csv_reader(file)?
            }
            SourceFormat::Spreadsheet { sheet } => Self::from_workbook(path, sheet)?,
        };

        info!(
            path = %path.display(),
            format = %table.format,
            rows = table.rows.len(),
            "Loaded source table"
        );
        Ok(table)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, SourceError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::None)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        require_column(headers.iter(), CSV_FIELDS.item_number)?;

        let mut rows = Vec::new();
        let mut unreadable = 0;
        for (idx, record) in rdr.byte_records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(record = idx + 1, error = %e, "Skipping unreadable CSV record");
                    unreadable += 1;
                    continue;
                }
            };
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            let mut row = SourceRow::new(line);
            for (header, value) in headers.iter().zip(record.iter()) {
                // Exports saved from spreadsheet tools are not always UTF-8.
                let value = String::from_utf8_lossy(value);
                row.cells.insert(header.to_string(), Cell::from_text(&value));
            }
            rows.push(row);
        }

        let mut table = Self::new(SourceFormat::Csv, rows);
        table.unreadable_records = unreadable;
        Ok(table)
    }

    pub fn from_workbook(path: &Path, sheet: &str) -> Result<Self, SourceError> {
        let mut workbook = open_workbook_auto(path)?;
        let sheet_names = workbook.sheet_names();
        if !sheet_names.iter().any(|name| name == sheet) {
            return Err(SourceError::MissingSheet(sheet.to_string()));
        }

        let rows = read_sheet(&mut workbook, sheet)?;
        let category_rows = if sheet_names.iter().any(|name| name == CATEGORY_SHEET) {
            Some(read_sheet(&mut workbook, CATEGORY_SHEET)?)
        } else {
            debug!(sheet = CATEGORY_SHEET, "No category sheet in workbook");
            None
        };

        let mut table = Self::new(
            SourceFormat::Spreadsheet {
                sheet: sheet.to_string(),
            },
            rows,
        );
        table.category_rows = category_rows;
        Ok(table)
    }
}

fn read_sheet(workbook: &mut Workbook, sheet: &str) -> Result<Vec<SourceRow>, SourceError> {
    let range = workbook.worksheet_range(sheet)?;

    let mut raw_rows = range.rows();
    let headers: Vec<String> = match raw_rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| match cell {
                Data::String(s) => s.to_string(),
                Data::Empty => String::new(),
                other => other.to_string(),
            })
            .collect(),
        None => return Ok(Vec::new()),
    };

    // Sheet row numbers are 1-based and the header occupies the first one.
    let first_line = range.start().map(|(row, _)| row as usize + 2).unwrap_or(2);
    let rows = raw_rows
        .enumerate()
        .map(|(idx, cells)| {
            let mut row = SourceRow::new(first_line + idx);
            for (header, data) in headers.iter().zip(cells) {
                if !header.is_empty() {
                    row.cells.insert(header.clone(), Cell::from(data));
                }
            }
            row
        })
        .filter(|row| row.cells.values().any(|cell| !cell.is_blank()))
        .collect();

    Ok(rows)
}

fn require_column<'a>(
    mut headers: impl Iterator<Item = &'a str>,
    column: &str,
) -> Result<(), SourceError> {
    if headers.any(|h| h == column) {
        Ok(())
    } else {
        Err(SourceError::MissingColumn(column.to_string()))
    }
}

/// Most recently modified `.csv` in `dir`.
pub fn latest_csv_in(dir: &Path) -> Result<PathBuf, SourceError> {
    let io_err = |source| SourceError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut latest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv || !path.is_file() {
            continue;
        }
        let modified = entry.metadata().and_then(|m| m.modified()).map_err(io_err)?;
        if latest.as_ref().map_or(true, |(best, _)| modified > *best) {
            latest = Some((modified, path));
        }
    }

    latest
        .map(|(_, path)| path)
        .ok_or_else(|| SourceError::NoInputs(dir.to_path_buf()))
}
