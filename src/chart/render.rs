use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use eframe::egui::Color32;
use thiserror::Error;

use super::request::{ChartKind, ChartRequest};
use super::resolver::{resolve_axes, AxisChoices, AxisRole, ResolveError};
use crate::color::{ColorMap, Theme};
use crate::data::model::{CellValue, Column, ColumnType, Dataset, Schema};

/// Days between 0001-01-01 and 1970-01-01 in chrono's CE day count.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Upper bound on histogram bins.
pub const MAX_HISTOGRAM_BINS: usize = 50;

/// Share of the slot between two adjacent x positions covered by bars.
const BAR_FILL: f64 = 0.8;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error(transparent)]
    Axis(#[from] ResolveError),

    #[error("column '{0}' does not exist in the data")]
    UnknownColumn(String),

    #[error("column '{column}' cannot be used as the {role} of a {kind} chart")]
    IncompatibleColumn {
        column: String,
        kind: ChartKind,
        role: AxisRole,
    },

    #[error("choose a column for the X axis")]
    MissingX,

    #[error("a {0} chart needs a Y column")]
    MissingY(ChartKind),

    #[error("nothing to plot: no rows have values for the selected columns")]
    NoData,
}

// ---------------------------------------------------------------------------
// Chart artifact
// ---------------------------------------------------------------------------

/// How x coordinates map back to labels.
#[derive(Debug, Clone, PartialEq)]
pub enum XScale {
    Numeric,
    /// x = days since the Unix epoch.
    Temporal,
    /// x = index into the labels.
    Categorical(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointSeries {
    pub name: String,
    pub color: Color32,
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarItem {
    pub x: f64,
    pub height: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub name: String,
    pub color: Color32,
    pub bars: Vec<BarItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub count: usize,
    pub fraction: f64,
    pub color: Color32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartBody {
    /// Stacked series share x positions; otherwise they sit side by side.
    Bars { series: Vec<BarSeries>, stacked: bool },
    Lines(Vec<PointSeries>),
    Points(Vec<PointSeries>),
    Pie(Vec<PieSlice>),
}

/// Everything the plot widget needs to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    pub title: String,
    pub kind: ChartKind,
    pub theme: Theme,
    pub x_label: String,
    pub y_label: String,
    pub x_scale: XScale,
    pub body: ChartBody,
}

// ---------------------------------------------------------------------------
// Date helpers shared with the plot widget
// ---------------------------------------------------------------------------

pub fn date_to_x(date: NaiveDate) -> f64 {
    (date.num_days_from_ce() - UNIX_EPOCH_CE_DAYS) as f64
}

pub fn x_to_date(x: f64) -> Option<NaiveDate> {
    let days = i32::try_from(x.round() as i64).ok()?;
    NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_CE_DAYS.checked_add(days)?)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check every column of the request against the schema before rendering.
pub fn validate(schema: &Schema, request: &ChartRequest) -> Result<(), ChartError> {
    let kind = request.kind;
    if !schema.contains(&request.x) {
        return Err(ChartError::UnknownColumn(request.x.clone()));
    }

    match resolve_axes(schema, kind, &request.x)? {
        AxisChoices::Names(names) => {
            if !names.contains(&request.x) {
                return Err(ChartError::IncompatibleColumn {
                    column: request.x.clone(),
                    kind,
                    role: AxisRole::Names,
                });
            }
        }
        AxisChoices::Y { columns, required } => match &request.y {
            Some(y) if !schema.contains(y) => return Err(ChartError::UnknownColumn(y.clone())),
            Some(y) if !columns.contains(y) => {
                return Err(ChartError::IncompatibleColumn {
                    column: y.clone(),
                    kind,
                    role: AxisRole::Y,
                })
            }
            None if required => return Err(ChartError::MissingY(kind)),
            _ => {}
        },
    }

    if let Some(color) = &request.color {
        if !schema.contains(color) {
            return Err(ChartError::UnknownColumn(color.clone()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Build the chart described by `request` from `dataset`.
pub fn render(dataset: &Dataset, request: &ChartRequest) -> Result<ChartArtifact, ChartError> {
    validate(&dataset.schema(), request)?;

    let x_col = column(dataset, &request.x)?;
    // Pie charts have no Y axis; a stale Y selection is ignored.
    let y_col = match (request.kind, &request.y) {
        (ChartKind::Pie, _) | (_, None) => None,
        (_, Some(y)) => Some(column(dataset, y)?),
    };
    let groups = match (request.kind, &request.color) {
        (ChartKind::Pie, _) => Vec::new(),
        (_, color) => row_groups(dataset, color.as_deref(), request.theme, y_col.or(Some(x_col)))?,
    };

    let (x_coords, x_scale) = x_coordinates(x_col);
    let y_numeric = y_col.filter(|c| c.column_type == ColumnType::Numeric);

    let (body, y_label) = match request.kind {
        ChartKind::Bar => {
            let y_label = match y_col {
                Some(y) if y_numeric.is_some() => y.name.clone(),
                Some(y) => format!("count of {}", y.name),
                None => "count".to_string(),
            };
            (bar_body(x_col, &x_coords, &x_scale, y_col, &groups), y_label)
        }
        ChartKind::Histogram => {
            let y_label = match y_numeric {
                Some(y) => format!("sum of {}", y.name),
                None => "count".to_string(),
            };
            (histogram_body(&x_coords, &x_scale, y_numeric, &groups), y_label)
        }
        ChartKind::Line | ChartKind::Scatter => {
            let y = y_col.ok_or(ChartError::MissingY(request.kind))?;
            let series = point_series(&x_coords, y, &groups, request.kind == ChartKind::Line);
            let body = if request.kind == ChartKind::Line {
                ChartBody::Lines(series)
            } else {
                ChartBody::Points(series)
            };
            (body, y.name.clone())
        }
        ChartKind::Pie => (pie_body(dataset, &x_col.name, request.theme), String::new()),
    };

    if body_is_empty(&body) {
        return Err(ChartError::NoData);
    }

    Ok(ChartArtifact {
        title: request.effective_title(),
        kind: request.kind,
        theme: request.theme,
        x_label: x_col.name.clone(),
        y_label,
        x_scale,
        body,
    })
}

fn column<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column, ChartError> {
    dataset
        .column(name)
        .ok_or_else(|| ChartError::UnknownColumn(name.to_string()))
}

fn body_is_empty(body: &ChartBody) -> bool {
    match body {
        ChartBody::Bars { series, .. } => series.iter().all(|s| s.bars.is_empty()),
        ChartBody::Lines(series) | ChartBody::Points(series) => {
            series.iter().all(|s| s.points.is_empty())
        }
        ChartBody::Pie(slices) => slices.is_empty(),
    }
}

/// Map the x column to plot coordinates.
fn x_coordinates(col: &Column) -> (Vec<Option<f64>>, XScale) {
    match col.column_type {
        ColumnType::Numeric => (
            col.values.iter().map(CellValue::as_f64).collect(),
            XScale::Numeric,
        ),
        ColumnType::Temporal => (
            col.values
                .iter()
                .map(|v| v.as_date().map(date_to_x))
                .collect(),
            XScale::Temporal,
        ),
        ColumnType::Categorical => {
            let labels: BTreeSet<&CellValue> = col.values.iter().filter(|v| !v.is_null()).collect();
            let index: BTreeMap<&CellValue, usize> =
                labels.iter().enumerate().map(|(i, v)| (*v, i)).collect();
            let coords = col
                .values
                .iter()
                .map(|v| index.get(v).map(|&i| i as f64))
                .collect();
            let labels = labels.into_iter().map(|v| v.to_string()).collect();
            (coords, XScale::Categorical(labels))
        }
    }
}

/// Rows sharing one value of the colour-grouping column.
struct Group {
    name: String,
    color: Color32,
    rows: Vec<usize>,
}

fn row_groups(
    dataset: &Dataset,
    color_column: Option<&str>,
    theme: Theme,
    fallback_name: Option<&Column>,
) -> Result<Vec<Group>, ChartError> {
    let Some(color_column) = color_column else {
        let color = theme.palette(1).first().copied().unwrap_or(Color32::LIGHT_BLUE);
        return Ok(vec![Group {
            name: fallback_name.map(|c| c.name.clone()).unwrap_or_default(),
            color,
            rows: (0..dataset.len()).collect(),
        }]);
    };

    let col = column(dataset, color_column)?;
    let mut by_value: BTreeMap<&CellValue, Vec<usize>> = BTreeMap::new();
    for (row, value) in col.values.iter().enumerate() {
        by_value.entry(value).or_default().push(row);
    }
    let values: BTreeSet<CellValue> = by_value.keys().map(|v| (*v).clone()).collect();
    let color_map = ColorMap::new(theme, &values);

    Ok(by_value
        .into_iter()
        .map(|(value, rows)| Group {
            name: value.to_string(),
            color: color_map.color_for(value),
            rows,
        })
        .collect())
}

/// Smallest gap between distinct sorted positions, 1.0 when there is none.
fn min_spacing(positions: &[f64]) -> f64 {
    positions
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0)
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d))))
        .unwrap_or(1.0)
}

fn bar_body(
    x_col: &Column,
    x_coords: &[Option<f64>],
    x_scale: &XScale,
    y_col: Option<&Column>,
    groups: &[Group],
) -> ChartBody {
    let y_numeric = y_col.is_some_and(|c| c.column_type == ColumnType::Numeric);

    // x value → (coordinate, height) per group
    let per_group: Vec<BTreeMap<&CellValue, (f64, f64)>> = groups
        .iter()
        .map(|g| {
            let mut heights: BTreeMap<&CellValue, (f64, f64)> = BTreeMap::new();
            for &row in &g.rows {
                let Some(x) = x_coords[row] else { continue };
                let contribution = match y_col {
                    Some(y) if y_numeric => match y.values[row].as_f64() {
                        Some(v) => v,
                        None => continue,
                    },
                    Some(y) if y.values[row].is_null() => continue,
                    _ => 1.0,
                };
                heights.entry(&x_col.values[row]).or_insert((x, 0.0)).1 += contribution;
            }
            heights
        })
        .collect();

    let mut positions: Vec<f64> = per_group
        .iter()
        .flat_map(|m| m.values().map(|(x, _)| *x))
        .collect();
    positions.sort_by(f64::total_cmp);
    positions.dedup();
    let slot = match x_scale {
        XScale::Categorical(_) => 1.0,
        _ => min_spacing(&positions),
    };

    let total_width = slot * BAR_FILL;
    let n = groups.len().max(1) as f64;
    let width = total_width / n;

    let series = groups
        .iter()
        .zip(per_group)
        .enumerate()
        .map(|(gi, (g, heights))| BarSeries {
            name: g.name.clone(),
            color: g.color,
            bars: heights
                .into_values()
                .map(|(x, height)| BarItem {
                    x: x - total_width / 2.0 + width * (gi as f64 + 0.5),
                    height,
                    width,
                })
                .collect(),
        })
        .collect();

    ChartBody::Bars {
        series,
        stacked: false,
    }
}

/// Sturges' rule, capped at [`MAX_HISTOGRAM_BINS`].
fn bin_count(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    let bins = (n as f64).log2().ceil() as usize + 1;
    bins.clamp(1, MAX_HISTOGRAM_BINS)
}

fn histogram_body(
    x_coords: &[Option<f64>],
    x_scale: &XScale,
    y_numeric: Option<&Column>,
    groups: &[Group],
) -> ChartBody {
    let weight = |row: usize| -> Option<f64> {
        match y_numeric {
            Some(y) => y.values[row].as_f64(),
            None => Some(1.0),
        }
    };

    // Every series gets one bar per slot so stacked series line up.
    let mut series: Vec<BarSeries> = if let XScale::Categorical(labels) = x_scale {
        groups
            .iter()
            .map(|g| {
                let mut heights = vec![0.0; labels.len()];
                for &row in &g.rows {
                    if let (Some(x), Some(w)) = (x_coords[row], weight(row)) {
                        heights[x as usize] += w;
                    }
                }
                BarSeries {
                    name: g.name.clone(),
                    color: g.color,
                    bars: heights
                        .into_iter()
                        .enumerate()
                        .map(|(i, height)| BarItem {
                            x: i as f64,
                            height,
                            width: BAR_FILL,
                        })
                        .collect(),
                }
            })
            .collect()
    } else {
        let present: Vec<f64> = x_coords.iter().flatten().copied().collect();
        let (Some(min), Some(max)) = (
            present.iter().copied().reduce(f64::min),
            present.iter().copied().reduce(f64::max),
        ) else {
            return ChartBody::Bars {
                series: Vec::new(),
                stacked: true,
            };
        };

        let (n_bins, bin_width, start) = if (max - min).abs() < f64::EPSILON {
            (1, 1.0, min - 0.5)
        } else {
            let n_bins = bin_count(present.len());
            (n_bins, (max - min) / n_bins as f64, min)
        };

        groups
            .iter()
            .map(|g| {
                let mut heights = vec![0.0; n_bins];
                for &row in &g.rows {
                    if let (Some(x), Some(w)) = (x_coords[row], weight(row)) {
                        let bin = (((x - start) / bin_width).floor() as usize).min(n_bins - 1);
                        heights[bin] += w;
                    }
                }
                BarSeries {
                    name: g.name.clone(),
                    color: g.color,
                    bars: heights
                        .into_iter()
                        .enumerate()
                        .map(|(i, height)| BarItem {
                            x: start + (i as f64 + 0.5) * bin_width,
                            height,
                            width: bin_width,
                        })
                        .collect(),
                }
            })
            .collect()
    };
    // Groups with nothing to stack would only add empty legend entries.
    series.retain(|s| s.bars.iter().any(|b| b.height != 0.0));

    ChartBody::Bars {
        series,
        stacked: true,
    }
}

fn point_series(
    x_coords: &[Option<f64>],
    y_col: &Column,
    groups: &[Group],
    sort_by_x: bool,
) -> Vec<PointSeries> {
    groups
        .iter()
        .map(|g| {
            let mut points: Vec<[f64; 2]> = g
                .rows
                .iter()
                .filter_map(|&row| Some([x_coords[row]?, y_col.values[row].as_f64()?]))
                .collect();
            if sort_by_x {
                points.sort_by(|a, b| a[0].total_cmp(&b[0]));
            }
            PointSeries {
                name: g.name.clone(),
                color: g.color,
                points,
            }
        })
        .filter(|s| !s.points.is_empty())
        .collect()
}

fn pie_body(dataset: &Dataset, names_column: &str, theme: Theme) -> ChartBody {
    let counts = dataset.value_counts(names_column);
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    let colors = theme.palette(counts.len());
    ChartBody::Pie(
        counts
            .into_iter()
            .zip(colors)
            .map(|((value, count), color)| PieSlice {
                label: value.to_string(),
                count,
                fraction: count as f64 / total as f64,
                color,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_bytes;
    use anyhow::Result;

    const ACCIDENTS: &str = "\
fecha,tipo_accidente,ubicacion,heridos,velocidad
2023-01-03,Choque,Centro,2,40
2023-01-01,Atropello,Norte,1,30
2023-01-03,Choque,Centro,0,60
2023-01-02,Choque,Sur,3,
2023-01-01,Volcamiento,Centro,1,90
";

    fn accidents() -> Result<Dataset> {
        Ok(load_bytes(ACCIDENTS.as_bytes())?)
    }

    fn bars(artifact: &ChartArtifact) -> &[BarSeries] {
        match &artifact.body {
            ChartBody::Bars { series, .. } => series,
            other => panic!("expected bars, got {other:?}"),
        }
    }

    #[test]
    fn bar_sums_numeric_y_per_category() -> Result<()> {
        let ds = accidents()?;
        let req = ChartRequest::new(ChartKind::Bar, "ubicacion").with_y("heridos");
        let art = render(&ds, &req)?;
        assert_eq!(
            art.x_scale,
            XScale::Categorical(vec!["Centro".into(), "Norte".into(), "Sur".into()])
        );
        let series = bars(&art);
        assert_eq!(series.len(), 1);
        let heights: Vec<f64> = series[0].bars.iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![3.0, 1.0, 3.0]);
        assert_eq!(art.title, "Bar chart: ubicacion vs heridos");
        Ok(())
    }

    #[test]
    fn bar_counts_categorical_y() -> Result<()> {
        let ds = accidents()?;
        let req = ChartRequest::new(ChartKind::Bar, "fecha").with_y("tipo_accidente");
        let art = render(&ds, &req)?;
        assert_eq!(art.x_scale, XScale::Temporal);
        assert_eq!(art.y_label, "count of tipo_accidente");
        let heights: Vec<f64> = bars(&art)[0].bars.iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![2.0, 1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn bar_color_groups_sit_side_by_side() -> Result<()> {
        let ds = accidents()?;
        let req = ChartRequest::new(ChartKind::Bar, "ubicacion")
            .with_y("heridos")
            .with_color("tipo_accidente");
        let art = render(&ds, &req)?;
        let series = bars(&art);
        let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Atropello", "Choque", "Volcamiento"]);
        let width = series[0].bars[0].width;
        assert!((width - BAR_FILL / 3.0).abs() < 1e-9);
        assert_ne!(series[0].color, series[1].color);
        Ok(())
    }

    #[test]
    fn histogram_bins_cover_all_rows() -> Result<()> {
        let ds = accidents()?;
        let req = ChartRequest::new(ChartKind::Histogram, "heridos");
        let art = render(&ds, &req)?;
        let total: f64 = bars(&art)[0].bars.iter().map(|b| b.height).sum();
        assert_eq!(total, 5.0);
        assert_eq!(bars(&art)[0].bars.len(), bin_count(5));
        assert!(matches!(art.body, ChartBody::Bars { stacked: true, .. }));
        Ok(())
    }

    #[test]
    fn histogram_with_numeric_y_sums_it() -> Result<()> {
        let ds = accidents()?;
        let req = ChartRequest::new(ChartKind::Histogram, "ubicacion").with_y("velocidad");
        let art = render(&ds, &req)?;
        assert_eq!(art.y_label, "sum of velocidad");
        let heights: Vec<f64> = bars(&art)[0].bars.iter().map(|b| b.height).collect();
        // Centro 40+60+90, Norte 30, Sur has no speed
        assert_eq!(heights, vec![190.0, 30.0, 0.0]);
        Ok(())
    }

    #[test]
    fn categorical_histogram_drops_empty_color_groups() -> Result<()> {
        let ds = accidents()?;
        // The only 2023-01-02 row has no speed, so that group sums to nothing.
        let req = ChartRequest::new(ChartKind::Histogram, "ubicacion")
            .with_y("velocidad")
            .with_color("fecha");
        let art = render(&ds, &req)?;
        let series = bars(&art);
        assert_eq!(series.len(), 2);
        for s in series {
            assert_eq!(s.bars.len(), 3);
            assert!(s.bars.iter().any(|b| b.height > 0.0), "empty series {}", s.name);
        }
        Ok(())
    }

    #[test]
    fn line_points_are_sorted_by_x() -> Result<()> {
        let ds = accidents()?;
        let req = ChartRequest::new(ChartKind::Line, "fecha").with_y("heridos");
        let art = render(&ds, &req)?;
        let ChartBody::Lines(series) = &art.body else {
            panic!("expected lines");
        };
        let xs: Vec<f64> = series[0].points.iter().map(|p| p[0]).collect();
        let mut sorted = xs.clone();
        sorted.sort_by(f64::total_cmp);
        assert_eq!(xs, sorted);
        assert_eq!(xs.len(), 5);
        Ok(())
    }

    #[test]
    fn scatter_skips_rows_with_missing_values() -> Result<()> {
        let ds = accidents()?;
        let req = ChartRequest::new(ChartKind::Scatter, "heridos").with_y("velocidad");
        let art = render(&ds, &req)?;
        let ChartBody::Points(series) = &art.body else {
            panic!("expected points");
        };
        assert_eq!(series[0].points.len(), 4);
        Ok(())
    }

    #[test]
    fn pie_counts_names() -> Result<()> {
        let ds = accidents()?;
        let req = ChartRequest::new(ChartKind::Pie, "ubicacion").with_y("heridos");
        let art = render(&ds, &req)?;
        let ChartBody::Pie(slices) = &art.body else {
            panic!("expected pie");
        };
        let labels: Vec<(&str, usize)> = slices
            .iter()
            .map(|s| (s.label.as_str(), s.count))
            .collect();
        assert_eq!(labels, vec![("Centro", 3), ("Norte", 1), ("Sur", 1)]);
        let total: f64 = slices.iter().map(|s| s.fraction).sum();
        assert!((total - 1.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn incompatible_requests_are_rejected() -> Result<()> {
        let ds = accidents()?;

        let line_on_text = ChartRequest::new(ChartKind::Line, "fecha").with_y("ubicacion");
        assert!(matches!(
            render(&ds, &line_on_text),
            Err(ChartError::IncompatibleColumn { role: AxisRole::Y, .. })
        ));

        let pie_on_numbers = ChartRequest::new(ChartKind::Pie, "heridos");
        assert!(matches!(
            render(&ds, &pie_on_numbers),
            Err(ChartError::IncompatibleColumn { role: AxisRole::Names, .. })
        ));

        let bar_on_itself = ChartRequest::new(ChartKind::Bar, "heridos").with_y("heridos");
        assert!(matches!(
            render(&ds, &bar_on_itself),
            Err(ChartError::IncompatibleColumn { .. })
        ));

        let missing_y = ChartRequest::new(ChartKind::Scatter, "heridos");
        assert!(matches!(render(&ds, &missing_y), Err(ChartError::MissingY(ChartKind::Scatter))));

        let unknown = ChartRequest::new(ChartKind::Bar, "nope").with_y("heridos");
        assert!(matches!(render(&ds, &unknown), Err(ChartError::UnknownColumn(_))));
        Ok(())
    }

    #[test]
    fn categorical_only_line_is_blocked_without_artifact() -> Result<()> {
        let ds = load_bytes(b"tipo,ubicacion\nChoque,Centro\n")?;
        let req = ChartRequest::new(ChartKind::Line, "tipo").with_y("ubicacion");
        assert!(matches!(
            render(&ds, &req),
            Err(ChartError::Axis(ResolveError::NoCompatibleAxis { .. }))
        ));
        Ok(())
    }

    #[test]
    fn empty_selection_is_no_data() -> Result<()> {
        let ds = accidents()?.select_rows(&[]);
        let req = ChartRequest::new(ChartKind::Bar, "ubicacion").with_y("heridos");
        assert!(matches!(render(&ds, &req), Err(ChartError::NoData)));
        Ok(())
    }

    #[test]
    fn dates_map_to_epoch_days_and_back() {
        let d = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(date_to_x(d), 1.0);
        assert_eq!(x_to_date(1.2), Some(d));
    }
}
