use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Using `BTreeMap` / `BTreeSet` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Integer(_) | Float(_) => 1,
                Date(_) => 2,
                Text(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            // Mixed numeric cells compare by value, integers first on ties.
            (Integer(a), Float(b)) => (*a as f64).total_cmp(b).then(std::cmp::Ordering::Less),
            (Float(a), Integer(b)) => a.total_cmp(&(*b as f64)).then(std::cmp::Ordering::Greater),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Column types and schema
// ---------------------------------------------------------------------------

/// Inferred primitive type of a column, computed once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
    Temporal,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Categorical => "categorical",
            ColumnType::Temporal => "temporal",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered column-name → type mapping of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<(String, ColumnType)>,
}

impl Schema {
    pub fn new(fields: Vec<(String, ColumnType)>) -> Self {
        Schema { fields }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<ColumnType> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl<S: Into<String>> FromIterator<(S, ColumnType)> for Schema {
    fn from_iter<I: IntoIterator<Item = (S, ColumnType)>>(iter: I) -> Self {
        Schema::new(iter.into_iter().map(|(n, t)| (n.into(), t)).collect())
    }
}

// ---------------------------------------------------------------------------
// Column – one named, typed column of cells
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub values: Vec<CellValue>,
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// Column-oriented table. Every column has `n_rows` values.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset from columns of equal length.
    ///
    /// Returns `None` when the columns disagree on the row count.
    pub fn from_columns(columns: Vec<Column>) -> Option<Self> {
        let n_rows = columns.first().map_or(0, |c| c.values.len());
        if columns.iter().any(|c| c.values.len() != n_rows) {
            return None;
        }
        Some(Dataset { columns, n_rows })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.n_rows
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn schema(&self) -> Schema {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.column_type))
            .collect()
    }

    /// Derived dataset holding only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                column_type: c.column_type,
                values: rows
                    .iter()
                    .filter_map(|&r| c.values.get(r).cloned())
                    .collect(),
            })
            .collect();
        Dataset {
            columns,
            n_rows: rows.iter().filter(|&&r| r < self.n_rows).count(),
        }
    }

    /// Sorted set of distinct non-null values of a column.
    pub fn unique_values(&self, name: &str) -> BTreeSet<CellValue> {
        self.column(name)
            .map(|c| {
                c.values
                    .iter()
                    .filter(|v| !v.is_null())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Non-null value counts, highest count first, ties by value.
    pub fn value_counts(&self, name: &str) -> Vec<(CellValue, usize)> {
        let Some(col) = self.column(name) else {
            return Vec::new();
        };
        let mut counts: BTreeMap<&CellValue, usize> = BTreeMap::new();
        for v in col.values.iter().filter(|v| !v.is_null()) {
            *counts.entry(v).or_default() += 1;
        }
        let mut out: Vec<(CellValue, usize)> =
            counts.into_iter().map(|(v, n)| (v.clone(), n)).collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn text_column(name: &str, values: &[&str]) -> Column {
        Column {
            name: name.to_string(),
            column_type: ColumnType::Categorical,
            values: values
                .iter()
                .map(|v| {
                    if v.is_empty() {
                        CellValue::Null
                    } else {
                        CellValue::Text(v.to_string())
                    }
                })
                .collect(),
        }
    }

    pub(crate) fn int_column(name: &str, values: &[i64]) -> Column {
        Column {
            name: name.to_string(),
            column_type: ColumnType::Numeric,
            values: values.iter().map(|&v| CellValue::Integer(v)).collect(),
        }
    }

    #[test]
    fn from_columns_rejects_ragged_columns() {
        let ok = Dataset::from_columns(vec![
            int_column("a", &[1, 2]),
            text_column("b", &["x", "y"]),
        ]);
        assert_eq!(ok.map(|d| d.len()), Some(2));

        let ragged = Dataset::from_columns(vec![
            int_column("a", &[1, 2, 3]),
            text_column("b", &["x"]),
        ]);
        assert!(ragged.is_none());
    }

    #[test]
    fn select_rows_keeps_schema_and_leaves_source_untouched() {
        let ds = Dataset::from_columns(vec![
            int_column("a", &[10, 20, 30]),
            text_column("b", &["x", "y", "z"]),
        ])
        .unwrap();
        let sub = ds.select_rows(&[2, 0]);
        assert_eq!(sub.schema(), ds.schema());
        assert_eq!(sub.len(), 2);
        assert_eq!(
            sub.column("a").unwrap().values,
            vec![CellValue::Integer(30), CellValue::Integer(10)]
        );
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn value_counts_orders_by_count_then_value() {
        let ds = Dataset::from_columns(vec![text_column(
            "ubicacion",
            &["Centro", "Norte", "Centro", "", "Sur", "Norte", "Centro"],
        )])
        .unwrap();
        let counts = ds.value_counts("ubicacion");
        assert_eq!(
            counts,
            vec![
                (CellValue::Text("Centro".into()), 3),
                (CellValue::Text("Norte".into()), 2),
                (CellValue::Text("Sur".into()), 1),
            ]
        );
        assert_eq!(ds.unique_values("ubicacion").len(), 3);
        assert!(ds.value_counts("missing").is_empty());
    }

    #[test]
    fn mixed_numbers_order_by_value() {
        let mut set = BTreeSet::new();
        set.insert(CellValue::Float(2.5));
        set.insert(CellValue::Integer(3));
        set.insert(CellValue::Integer(1));
        let ordered: Vec<String> = set.iter().map(|v| v.to_string()).collect();
        assert_eq!(ordered, vec!["1", "2.5", "3"]);
    }
}
