use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use super::detect::is_date_column_name;
use super::model::{CellValue, Column, ColumnType, Dataset};

/// Why an input file could not be turned into a [`Dataset`].
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("the file is empty or has no header row")]
    Empty,

    #[error("malformed CSV: {0}")]
    Parse(#[from] csv::Error),

    #[error("only .csv files can be opened, not {0}")]
    NotCsv(String),
}

/// Cell spellings treated as missing values.
const NULL_TOKENS: &[&str] = &[
    "", "na", "n/a", "nan", "null", "none", "<na>", "#n/a", "-nan",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a CSV file from disk.
pub fn load_file(path: &Path) -> Result<Dataset, LoadError> {
    let bytes = std::fs::read(path)?;
    load_bytes(&bytes)
}

/// Whether a path names a CSV file, judged by its extension.
pub fn is_csv_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Parse raw CSV bytes (comma-delimited, header row first).
///
/// Column types are inferred from the cell contents. Columns whose header
/// looks like a date column are coerced to dates, with unparseable cells
/// becoming null.
pub fn load_bytes(bytes: &[u8]) -> Result<Dataset, LoadError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(LoadError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .from_reader(bytes);

    let headers = unique_headers(reader.headers()?.iter());
    if headers.is_empty() {
        return Err(LoadError::Empty);
    }

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for result in reader.records() {
        let record = result?;
        for (col_idx, cells) in raw.iter_mut().enumerate() {
            cells.push(record.get(col_idx).unwrap_or("").to_string());
        }
    }

    let columns: Vec<Column> = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| build_column(name, &cells))
        .collect();

    // Every column is filled once per record, so lengths always agree.
    Ok(Dataset::from_columns(columns).unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Rename repeated headers to `name.1`, `name.2`, … so lookups stay unique.
/// Blank headers become `Unnamed: <position>`.
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for (idx, header) in raw.enumerate() {
        let base = match header.trim() {
            "" => format!("Unnamed: {idx}"),
            h => h.to_string(),
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

// ---------------------------------------------------------------------------
// Type inference
// ---------------------------------------------------------------------------

fn is_null_token(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    NULL_TOKENS.contains(&lower.as_str())
}

fn build_column(name: String, cells: &[String]) -> Column {
    let column_type = if is_date_column_name(&name) && coercible_to_dates(cells) {
        ColumnType::Temporal
    } else {
        infer_type(cells)
    };

    let values = cells
        .iter()
        .map(|cell| {
            let cell = cell.trim();
            if is_null_token(cell) {
                return CellValue::Null;
            }
            match column_type {
                ColumnType::Numeric => parse_number(cell).unwrap_or(CellValue::Null),
                ColumnType::Temporal => parse_date(cell)
                    .map(CellValue::Date)
                    .unwrap_or(CellValue::Null),
                ColumnType::Categorical => CellValue::Text(cell.to_string()),
            }
        })
        .collect();

    Column {
        name,
        column_type,
        values,
    }
}

/// A date-named column is coerced unless none of its cells is a date.
fn coercible_to_dates(cells: &[String]) -> bool {
    let mut present = cells
        .iter()
        .map(|c| c.trim())
        .filter(|c| !is_null_token(c))
        .peekable();
    present.peek().is_none() || present.any(|c| parse_date(c).is_some())
}

/// Numeric when every non-null cell is a number, temporal when every one is
/// a date, categorical otherwise (including all-null columns).
fn infer_type(cells: &[String]) -> ColumnType {
    let mut present = cells
        .iter()
        .map(|c| c.trim())
        .filter(|c| !is_null_token(c))
        .peekable();
    if present.peek().is_none() {
        return ColumnType::Categorical;
    }
    let present: Vec<&str> = present.collect();

    if present.iter().all(|c| parse_number(c).is_some()) {
        ColumnType::Numeric
    } else if present.iter().all(|c| parse_date(c).is_some()) {
        ColumnType::Temporal
    } else {
        ColumnType::Categorical
    }
}

fn parse_number(s: &str) -> Option<CellValue> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(CellValue::Integer(i));
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(CellValue::Float(f)),
        _ => None,
    }
}

/// Parse a date or datetime cell; the time of day is dropped.
fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}
