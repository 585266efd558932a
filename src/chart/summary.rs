//! Key figures shown above the chart builder.

use std::collections::BTreeMap;

use eframe::egui::Color32;

use super::render::{date_to_x, ChartArtifact, ChartBody, PointSeries, XScale};
use super::request::ChartKind;
use crate::color::Theme;
use crate::data::detect::category_columns;
use crate::data::model::{CellValue, Dataset};

/// How many values of each category column are listed.
pub const TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct KeyStats {
    pub total_rows: usize,
    /// (column, top values with their counts) per known category column.
    pub top_values: Vec<(String, Vec<(CellValue, usize)>)>,
}

pub fn key_stats(dataset: &Dataset) -> KeyStats {
    let top_values = category_columns(&dataset.schema())
        .into_iter()
        .map(|col| {
            let mut counts = dataset.value_counts(&col);
            counts.truncate(TOP_N);
            (col, counts)
        })
        .collect();
    KeyStats {
        total_rows: dataset.len(),
        top_values,
    }
}

/// Line chart of the number of rows per calendar day of `date_column`.
///
/// Returns `None` when the column is missing or holds no dates.
pub fn accidents_per_day(
    dataset: &Dataset,
    date_column: &str,
    theme: Theme,
) -> Option<ChartArtifact> {
    let col = dataset.column(date_column)?;
    let mut per_day: BTreeMap<_, usize> = BTreeMap::new();
    for date in col.values.iter().filter_map(CellValue::as_date) {
        *per_day.entry(date).or_default() += 1;
    }
    if per_day.is_empty() {
        return None;
    }

    let points = per_day
        .into_iter()
        .map(|(day, n)| [date_to_x(day), n as f64])
        .collect();
    let color = theme.palette(1).first().copied().unwrap_or(Color32::LIGHT_BLUE);

    Some(ChartArtifact {
        title: "Accidents per day".to_string(),
        kind: ChartKind::Line,
        theme,
        x_label: date_column.to_string(),
        y_label: "Number of accidents".to_string(),
        x_scale: XScale::Temporal,
        body: ChartBody::Lines(vec![PointSeries {
            name: "accidents".to_string(),
            color,
            points,
        }]),
    })
}
