use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::model::{CellValue, Dataset};

// ---------------------------------------------------------------------------
// Filter predicate
// ---------------------------------------------------------------------------

/// Which columns the range filters apply to. Either may be absent, which
/// disables the corresponding range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterColumns {
    pub date: Option<String>,
    pub year: Option<String>,
}

/// Active filters of the session.
///
/// Category selections map column_name → selected values. A missing or empty
/// set means "no filter" (show all).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    /// Inclusive date range on the date column.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Inclusive year range on the year column.
    pub year_range: Option<(i64, i64)>,
    pub categories: BTreeMap<String, BTreeSet<CellValue>>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.date_range.is_none()
            && self.year_range.is_none()
            && self.categories.values().all(|s| s.is_empty())
    }
}

/// Min/max of the date column, ignoring nulls.
pub fn date_bounds(dataset: &Dataset, column: &str) -> Option<(NaiveDate, NaiveDate)> {
    let col = dataset.column(column)?;
    let mut dates = col.values.iter().filter_map(CellValue::as_date);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

/// Min/max of the year column as whole years, ignoring nulls.
pub fn year_bounds(dataset: &Dataset, column: &str) -> Option<(i64, i64)> {
    let col = dataset.column(column)?;
    let mut years = col
        .values
        .iter()
        .filter_map(CellValue::as_f64)
        .map(|y| y.floor() as i64);
    let first = years.next()?;
    Some(years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
}

/// Return indices of rows that pass all active filters.
///
/// * A range filter whose column is missing from the dataset is ignored.
/// * Rows with a null value in a range-filtered column fail the range.
/// * A category filter on a column missing from the dataset is ignored.
pub fn filtered_indices(
    dataset: &Dataset,
    filters: &FilterState,
    columns: &FilterColumns,
) -> Vec<usize> {
    let date_col = filters
        .date_range
        .and_then(|range| Some((columns.date.as_deref().and_then(|c| dataset.column(c))?, range)));
    let year_col = filters
        .year_range
        .and_then(|range| Some((columns.year.as_deref().and_then(|c| dataset.column(c))?, range)));
    let category_cols: Vec<_> = filters
        .categories
        .iter()
        .filter(|(_, selected)| !selected.is_empty())
        .filter_map(|(name, selected)| Some((dataset.column(name)?, selected)))
        .collect();

    (0..dataset.len())
        .filter(|&row| {
            if let Some((col, (start, end))) = date_col {
                match col.values[row].as_date() {
                    Some(d) if d >= start && d <= end => {}
                    _ => return false,
                }
            }
            if let Some((col, (start, end))) = year_col {
                match col.values[row].as_f64().map(|y| y.floor() as i64) {
                    Some(y) if y >= start && y <= end => {}
                    _ => return false,
                }
            }
            category_cols
                .iter()
                .all(|(col, selected)| selected.contains(&col.values[row]))
        })
        .collect()
}

/// Derived dataset holding the rows that pass the filters. The input is
/// never modified.
pub fn apply(dataset: &Dataset, filters: &FilterState, columns: &FilterColumns) -> Dataset {
    if filters.is_empty() {
        return dataset.clone();
    }
    dataset.select_rows(&filtered_indices(dataset, filters, columns))
}
