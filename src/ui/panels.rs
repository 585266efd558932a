use std::path::Path;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::chart::request::ChartKind;
use crate::chart::resolver::AxisChoices;
use crate::color::Theme;
use crate::state::{AppState, StatusLevel};
use crate::ui::{plot, preview};

// ---------------------------------------------------------------------------
// Left side panel – file, theme and filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Data");
    if ui.button("Open CSV…").clicked() {
        open_file_dialog(state);
    }
    ui.label(RichText::new("or drop a .csv file on the window").weak());
    ui.separator();

    ui.strong("Chart theme");
    let current = state.selection.theme;
    for theme in Theme::ALL {
        if ui.radio(current == theme, theme.label()).clicked() {
            state.set_theme(theme);
        }
    }
    ui.separator();

    if state.source.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            date_filter(ui, state);
            year_filter(ui, state);
            category_filters(ui, state);
        });
}

fn date_filter(ui: &mut Ui, state: &mut AppState) {
    let Some(source) = &state.source else { return };
    if source.date_columns.is_empty() {
        return;
    }
    let date_columns = source.date_columns.clone();

    ui.strong("Date filter");
    let current = state.filter_columns.date.clone().unwrap_or_default();
    if date_columns.len() > 1 {
        egui::ComboBox::from_id_salt("date_column")
            .selected_text(&current)
            .show_ui(ui, |ui: &mut Ui| {
                for col in &date_columns {
                    if ui.selectable_label(current == *col, col).clicked() {
                        state.set_date_column(col);
                    }
                }
            });
    }

    let Some((min, max)) = state.date_bounds() else {
        ui.label("The date column holds no valid dates.");
        ui.separator();
        return;
    };
    let (mut start, mut end) = state.filters.date_range.unwrap_or((min, max));
    let before = (start, end);

    ui.horizontal(|ui: &mut Ui| {
        ui.label("From");
        ui.add(DatePickerButton::new(&mut start).id_salt("date_start"));
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label("To");
        ui.add(DatePickerButton::new(&mut end).id_salt("date_end"));
    });

    if (start, end) != before {
        let start = start.clamp(min, max);
        let end = end.clamp(min, max);
        state.set_date_range(Some((start, end)));
    }
    if state.filters.date_range.is_some() && ui.small_button("Reset dates").clicked() {
        state.set_date_range(None);
    }
    ui.separator();
}

fn year_filter(ui: &mut Ui, state: &mut AppState) {
    let Some(source) = &state.source else { return };
    if source.year_columns.is_empty() {
        return;
    }
    let year_columns = source.year_columns.clone();
    let Some((min, max)) = state.year_bounds() else {
        return;
    };

    ui.strong("Year filter");
    let current = state.filter_columns.year.clone().unwrap_or_default();
    if year_columns.len() > 1 {
        egui::ComboBox::from_id_salt("year_column")
            .selected_text(&current)
            .show_ui(ui, |ui: &mut Ui| {
                for col in &year_columns {
                    if ui.selectable_label(current == *col, col).clicked() {
                        state.set_year_column(col);
                    }
                }
            });
    }

    let (mut start, mut end) = state.filters.year_range.unwrap_or((min, max));
    let before = (start, end);
    ui.add(egui::Slider::new(&mut start, min..=max).text("from"));
    ui.add(egui::Slider::new(&mut end, min..=max).text("to"));
    if (start, end) != before {
        state.set_year_range(Some((start, end)));
    }
    if state.filters.year_range.is_some() && ui.small_button("Reset years").clicked() {
        state.set_year_range(None);
    }
    ui.separator();
}

fn category_filters(ui: &mut Ui, state: &mut AppState) {
    let Some(source) = &state.source else { return };
    let columns = source.category_columns.clone();

    for col in &columns {
        let options = state.category_options(col);
        let n_selected = state.filters.categories.get(col).map_or(0, |s| s.len());
        let header_text = if n_selected == 0 {
            format!("{col}  (all)")
        } else {
            format!("{col}  ({n_selected}/{})", options.len())
        };

        egui::CollapsingHeader::new(RichText::new(header_text).strong())
            .id_salt(col)
            .default_open(false)
            .show(ui, |ui: &mut Ui| {
                if ui.small_button("Clear").clicked() {
                    state.clear_category(col);
                }
                for value in &options {
                    let mut checked = state
                        .filters
                        .categories
                        .get(col)
                        .is_some_and(|s| s.contains(value));
                    if ui.checkbox(&mut checked, value.to_string()).changed() {
                        state.toggle_category(col, value);
                    }
                }
            });
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(source), Some(view)) = (&state.source, &state.view) {
            ui.label(format!(
                "{}: {} rows loaded, {} after filters",
                source.file_name,
                source.dataset.len(),
                view.len()
            ));
        }

        ui.separator();

        if let Some(status) = &state.status {
            let color = match status.level {
                StatusLevel::Info => Color32::DARK_GREEN,
                StatusLevel::Warning => Color32::from_rgb(200, 140, 0),
                StatusLevel::Error => Color32::RED,
            };
            ui.label(RichText::new(&status.text).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// Central panel – overview and chart builder
// ---------------------------------------------------------------------------

pub fn main_view(ui: &mut Ui, state: &mut AppState) {
    if state.view.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a CSV file of accident records to begin  (File → Open…)");
        });
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            overview(ui, state);
            ui.separator();
            chart_builder(ui, state);
        });
}

/// Column list, data preview, key figures and the accidents-per-day chart.
fn overview(ui: &mut Ui, state: &AppState) {
    let Some(view) = &state.view else { return };

    let names = view.column_names().join(", ");
    ui.label(RichText::new(format!("Columns: {names}")).strong());
    ui.add_space(4.0);

    egui::CollapsingHeader::new("Data preview")
        .default_open(true)
        .show(ui, |ui: &mut Ui| preview::preview_table(ui, view));

    if view.is_empty() {
        ui.label(RichText::new("No rows match the current filters.").weak());
    }

    if let Some(stats) = state.key_stats() {
        ui.heading("Key figures");
        ui.label(format!("Total accidents: {}", stats.total_rows));
        for (col, counts) in &stats.top_values {
            ui.label(RichText::new(format!("Top {col}:")).strong());
            for (value, n) in counts {
                ui.label(format!("  {value}: {n}"));
            }
        }
    }

    if let Some(daily) = state.daily_chart() {
        ui.separator();
        plot::chart_plot(ui, "daily_plot", &daily, 220.0);
    }
}

fn chart_builder(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Chart builder");

    let columns = state
        .view
        .as_ref()
        .map(|v| v.column_names())
        .unwrap_or_default();
    let x_options = state.x_options();
    let choices = state.axis_choices();

    egui::Grid::new("chart_controls")
        .num_columns(2)
        .spacing([12.0, 6.0])
        .show(ui, |ui: &mut Ui| {
            ui.label("Chart type");
            let kind = state.selection.kind;
            egui::ComboBox::from_id_salt("chart_kind")
                .selected_text(kind.as_str())
                .show_ui(ui, |ui: &mut Ui| {
                    for k in ChartKind::ALL {
                        if ui.selectable_label(kind == k, k.as_str()).clicked() {
                            state.set_chart_kind(k);
                        }
                    }
                });
            ui.end_row();

            let x_label = if kind == ChartKind::Pie { "Names" } else { "X axis" };
            ui.label(x_label);
            let current_x = state.selection.x.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("x_axis")
                .selected_text(&current_x)
                .show_ui(ui, |ui: &mut Ui| {
                    for col in &x_options {
                        if ui.selectable_label(current_x == *col, col).clicked() {
                            state.set_x_column(col);
                        }
                    }
                });
            ui.end_row();

            if let Some(Ok(AxisChoices::Y { columns: y_options, required })) = &choices {
                ui.label("Y axis");
                let current_y = state.selection.y.clone();
                egui::ComboBox::from_id_salt("y_axis")
                    .selected_text(current_y.as_deref().unwrap_or("(none)"))
                    .show_ui(ui, |ui: &mut Ui| {
                        if !required
                            && ui.selectable_label(current_y.is_none(), "(none)").clicked()
                        {
                            state.set_y_column(None);
                        }
                        for col in y_options {
                            if ui
                                .selectable_label(current_y.as_deref() == Some(col), col)
                                .clicked()
                            {
                                state.set_y_column(Some(col));
                            }
                        }
                    });
                ui.end_row();
            }

            if kind != ChartKind::Pie {
                ui.label("Color by");
                let current_color = state.selection.color.clone();
                egui::ComboBox::from_id_salt("color_by")
                    .selected_text(current_color.as_deref().unwrap_or("(none)"))
                    .show_ui(ui, |ui: &mut Ui| {
                        if ui.selectable_label(current_color.is_none(), "(none)").clicked() {
                            state.set_color_column(None);
                        }
                        for col in &columns {
                            if ui
                                .selectable_label(current_color.as_deref() == Some(col), col)
                                .clicked()
                            {
                                state.set_color_column(Some(col));
                            }
                        }
                    });
                ui.end_row();
            }

            ui.label("Title");
            let mut title = state.selection.title.clone();
            if ui
                .add(egui::TextEdit::singleline(&mut title).hint_text("automatic"))
                .changed()
            {
                state.set_title(&title);
            }
            ui.end_row();
        });

    if let Some(Err(e)) = &choices {
        ui.label(RichText::new(e.to_string()).color(Color32::from_rgb(200, 140, 0)));
    }

    if ui
        .add_enabled(state.can_generate(), egui::Button::new("Generate chart"))
        .clicked()
    {
        // Failures are reported through the status line.
        let _ = state.generate_chart();
    }

    if let Some(chart) = &state.chart {
        ui.add_space(8.0);
        plot::chart_plot(ui, "chart_plot", chart, 420.0);
    }
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open accident data")
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        open_path(state, &path);
    }
}

/// Load a file picked or dropped by the user. Errors end up in the status line.
pub fn open_path(state: &mut AppState, path: &Path) {
    let _ = state.load_path(path);
}
