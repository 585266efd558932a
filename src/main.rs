mod app;
mod chart;
mod color;
mod data;
mod state;
mod ui;

use app::CrashChartsApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Crash Charts – Accident Explorer",
        options,
        Box::new(|_cc| Ok(Box::new(CrashChartsApp::default()))),
    )
}
