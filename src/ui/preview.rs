use eframe::egui::{RichText, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::model::Dataset;

/// Rows shown in the data preview.
pub const PREVIEW_ROWS: usize = 50;

/// Render the first rows of the dataset as a striped table.
pub fn preview_table(ui: &mut Ui, dataset: &Dataset) {
    let columns = dataset.columns();
    if columns.is_empty() {
        ui.label("No columns.");
        return;
    }
    let n_rows = dataset.len().min(PREVIEW_ROWS);

    TableBuilder::new(ui)
        .id_salt("data_preview")
        .striped(true)
        .resizable(true)
        .max_scroll_height(260.0)
        .columns(TableColumn::auto().at_least(60.0), columns.len())
        .header(22.0, |mut header| {
            for col in columns {
                header.col(|ui: &mut Ui| {
                    ui.strong(&col.name)
                        .on_hover_text(col.column_type.as_str());
                });
            }
        })
        .body(|body| {
            body.rows(18.0, n_rows, |mut row| {
                let r = row.index();
                for col in columns {
                    row.col(|ui: &mut Ui| {
                        let value = &col.values[r];
                        if value.is_null() {
                            ui.label(RichText::new("—").weak());
                        } else {
                            ui.label(value.to_string());
                        }
                    });
                }
            });
        });

    if dataset.len() > n_rows {
        ui.label(
            RichText::new(format!("Showing {n_rows} of {} rows", dataset.len())).weak(),
        );
    }
}
