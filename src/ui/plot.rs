use std::f64::consts::TAU;
use std::ops::RangeInclusive;

use eframe::egui::{Stroke, Ui};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints, Points, Polygon};

use crate::chart::render::{x_to_date, ChartArtifact, ChartBody, PieSlice, XScale};
use crate::chart::request::ChartKind;

/// Segments used to approximate a full pie circle.
const PIE_SEGMENTS: usize = 180;

// ---------------------------------------------------------------------------
// Chart plot
// ---------------------------------------------------------------------------

/// Draw a rendered chart with its title.
pub fn chart_plot(ui: &mut Ui, id: &str, artifact: &ChartArtifact, height: f32) {
    ui.heading(&artifact.title);

    let theme = artifact.theme;
    let is_pie = artifact.kind == ChartKind::Pie;

    let mut plot = Plot::new(id)
        .legend(Legend::default())
        .height(height)
        .show_grid(theme.show_grid() && !is_pie)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);

    if is_pie {
        plot = plot.data_aspect(1.0).show_axes(false);
    } else {
        plot = plot
            .x_axis_label(artifact.x_label.clone())
            .y_axis_label(artifact.y_label.clone());
        match &artifact.x_scale {
            XScale::Numeric => {}
            XScale::Temporal => {
                plot = plot.x_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| {
                    x_to_date(mark.value)
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default()
                });
            }
            XScale::Categorical(labels) => {
                let labels = labels.clone();
                plot = plot.x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
                    let idx = mark.value.round();
                    if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                        return String::new();
                    }
                    labels.get(idx as usize).cloned().unwrap_or_default()
                });
            }
        }
    }

    ui.scope(|ui: &mut Ui| {
        ui.visuals_mut().extreme_bg_color = theme.background();
        plot.show(ui, |plot_ui| match &artifact.body {
            ChartBody::Bars { series, stacked } => {
                let mut charts: Vec<BarChart> = Vec::with_capacity(series.len());
                for s in series {
                    let bars = s
                        .bars
                        .iter()
                        .map(|b| Bar::new(b.x, b.height).width(b.width).fill(s.color))
                        .collect();
                    let mut chart = BarChart::new(bars).name(&s.name).color(s.color);
                    if *stacked {
                        let below: Vec<&BarChart> = charts.iter().collect();
                        chart = chart.stack_on(&below);
                    }
                    charts.push(chart);
                }
                for chart in charts {
                    plot_ui.bar_chart(chart);
                }
            }
            ChartBody::Lines(series) => {
                for s in series {
                    let points: PlotPoints = s.points.iter().copied().collect();
                    plot_ui.line(Line::new(points).name(&s.name).color(s.color).width(2.0));
                }
            }
            ChartBody::Points(series) => {
                for s in series {
                    let points: PlotPoints = s.points.iter().copied().collect();
                    plot_ui.points(Points::new(points).name(&s.name).color(s.color).radius(3.0));
                }
            }
            ChartBody::Pie(slices) => {
                for polygon in pie_polygons(slices) {
                    plot_ui.polygon(polygon);
                }
            }
        });
    });
}

/// One filled wedge per slice on the unit circle, clockwise from the top.
fn pie_polygons(slices: &[PieSlice]) -> Vec<Polygon<'_>> {
    let mut start = 0.0;
    slices
        .iter()
        .map(|slice| {
            let sweep = slice.fraction * TAU;
            let steps = ((slice.fraction * PIE_SEGMENTS as f64).ceil() as usize).max(1);
            let mut points = vec![[0.0, 0.0]];
            points.extend((0..=steps).map(|i| {
                let angle = start + sweep * i as f64 / steps as f64;
                // Angle 0 at 12 o'clock, growing clockwise.
                [angle.sin(), angle.cos()]
            }));
            start += sweep;

            let name = format!("{} ({:.1}%)", slice.label, slice.fraction * 100.0);
            Polygon::new(PlotPoints::from(points))
                .fill_color(slice.color)
                .stroke(Stroke::new(1.0, eframe::egui::Color32::WHITE))
                .name(name)
        })
        .collect()
}
