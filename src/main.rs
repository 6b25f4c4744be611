mod app;
mod color;
mod data;
mod state;
mod ui;

use std::path::PathBuf;

use app::TrendscopeApp;
use eframe::egui;

/// Dataset loaded at startup when no path is given on the command line.
const DEFAULT_DATASET: &str = "shopping_trends.csv";

fn main() -> eframe::Result {
    env_logger::init();

    let initial_file = std::env::args_os().nth(1).map(PathBuf::from).or_else(|| {
        let fallback = PathBuf::from(DEFAULT_DATASET);
        fallback.exists().then_some(fallback)
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([700.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Trendscope – Shopping Trends Dashboard",
        options,
        Box::new(move |cc| {
            // Install image loaders so egui can render png/jpg/etc.
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(TrendscopeApp::new(initial_file)))
        }),
    )
}
