//! Column-name heuristics that switch on the optional filters.
//!
//! Matching is a case-insensitive substring test on the header. A dataset
//! without a matching column simply gets no such filter.

use super::model::{ColumnType, Schema};

/// Header fragments that mark a date column.
pub const DATE_TOKENS: &[&str] = &["fecha", "date"];

/// Header fragments that mark a year column.
pub const YEAR_TOKENS: &[&str] = &["año", "anio", "year"];

/// Accident-type dimension column.
pub const ACCIDENT_TYPE_COLUMN: &str = "tipo_accidente";

/// Location dimension column.
pub const LOCATION_COLUMN: &str = "ubicacion";

/// Category columns offered as multiselect filters, in display order.
pub const CATEGORY_COLUMNS: &[&str] = &[ACCIDENT_TYPE_COLUMN, LOCATION_COLUMN];

fn matches_any(name: &str, tokens: &[&str]) -> bool {
    let lower = name.to_lowercase();
    tokens.iter().any(|t| lower.contains(t))
}

pub fn is_date_column_name(name: &str) -> bool {
    matches_any(name, DATE_TOKENS)
}

pub fn is_year_column_name(name: &str) -> bool {
    matches_any(name, YEAR_TOKENS)
}

/// Candidate date columns: name matches and the column parsed as temporal.
pub fn date_columns(schema: &Schema) -> Vec<String> {
    schema
        .iter()
        .filter(|(name, ty)| *ty == ColumnType::Temporal && is_date_column_name(name))
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Candidate year columns: name matches and the column is numeric.
pub fn year_columns(schema: &Schema) -> Vec<String> {
    schema
        .iter()
        .filter(|(name, ty)| *ty == ColumnType::Numeric && is_year_column_name(name))
        .map(|(name, _)| name.to_string())
        .collect()
}

/// The known category columns present in the schema.
pub fn category_columns(schema: &Schema) -> Vec<String> {
    CATEGORY_COLUMNS
        .iter()
        .filter(|c| schema.contains(c))
        .map(|c| c.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_heuristics_are_case_insensitive_substrings() {
        assert!(is_date_column_name("Fecha_Accidente"));
        assert!(is_date_column_name("report_date"));
        assert!(!is_date_column_name("hora"));
        assert!(is_year_column_name("AÑO"));
        assert!(is_year_column_name("anio_registro"));
        assert!(is_year_column_name("Year"));
        assert!(!is_year_column_name("mes"));
    }

    #[test]
    fn detection_requires_matching_type() {
        let schema: Schema = [
            ("fecha", ColumnType::Temporal),
            ("fecha_texto", ColumnType::Categorical),
            ("año", ColumnType::Numeric),
            ("year_label", ColumnType::Categorical),
            ("ubicacion", ColumnType::Categorical),
        ]
        .into_iter()
        .collect();

        assert_eq!(date_columns(&schema), vec!["fecha"]);
        assert_eq!(year_columns(&schema), vec!["año"]);
        assert_eq!(category_columns(&schema), vec!["ubicacion"]);
    }
}
