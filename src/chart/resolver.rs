//! Which columns may fill the second axis of a chart.
//!
//! Everything here is a pure function of the dataset schema and the chart
//! selection: no I/O, no hidden state.

use std::fmt;

use thiserror::Error;

use super::request::ChartKind;
use crate::data::model::{ColumnType, Schema};

/// The field of a chart request that the resolver validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisRole {
    /// Secondary axis of bar, histogram, line and scatter charts.
    Y,
    /// Slice labels of a pie chart.
    Names,
}

impl fmt::Display for AxisRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisRole::Y => f.write_str("Y axis"),
            AxisRole::Names => f.write_str("names field"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No column of the dataset can serve the given role for this chart kind.
    #[error("no column is compatible with the {role} of a {kind} chart; choose another chart kind or X column, or load a different file")]
    NoCompatibleAxis { kind: ChartKind, role: AxisRole },
}

/// Allowed choices for the field the resolver validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisChoices {
    /// Candidate Y columns; `required` is false when the chart can be drawn
    /// without one.
    Y { columns: Vec<String>, required: bool },
    /// Candidate names columns of a pie chart.
    Names(Vec<String>),
}

/// Columns allowed on the Y axis, in schema order.
///
/// * Line, Scatter: numeric columns only, including `x_column` itself.
/// * Bar, Histogram: every column except `x_column`.
/// * Pie: none, pie charts have no Y axis.
pub fn eligible_y_columns(schema: &Schema, kind: ChartKind, x_column: &str) -> Vec<String> {
    match kind {
        ChartKind::Line | ChartKind::Scatter => schema
            .iter()
            .filter(|(_, ty)| *ty == ColumnType::Numeric)
            .map(|(name, _)| name.to_string())
            .collect(),
        ChartKind::Bar | ChartKind::Histogram => schema
            .names()
            .filter(|name| *name != x_column)
            .map(str::to_string)
            .collect(),
        ChartKind::Pie => Vec::new(),
    }
}

/// Columns allowed as the names field of a pie chart: categorical only.
pub fn eligible_name_columns(schema: &Schema) -> Vec<String> {
    schema
        .iter()
        .filter(|(_, ty)| *ty == ColumnType::Categorical)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Resolve the candidates for the current selection, failing with
/// [`ResolveError::NoCompatibleAxis`] when a required field has none.
pub fn resolve_axes(
    schema: &Schema,
    kind: ChartKind,
    x_column: &str,
) -> Result<AxisChoices, ResolveError> {
    if kind == ChartKind::Pie {
        let names = eligible_name_columns(schema);
        if names.is_empty() {
            return Err(ResolveError::NoCompatibleAxis {
                kind,
                role: AxisRole::Names,
            });
        }
        return Ok(AxisChoices::Names(names));
    }

    let columns = eligible_y_columns(schema, kind, x_column);
    let required = !kind.y_optional();
    if required && columns.is_empty() {
        return Err(ResolveError::NoCompatibleAxis {
            kind,
            role: AxisRole::Y,
        });
    }
    Ok(AxisChoices::Y { columns, required })
}
