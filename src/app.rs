use std::path::PathBuf;

use eframe::egui;

use crate::state::AppState;
use crate::ui::{charts, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct TrendscopeApp {
    pub state: AppState,
}

impl TrendscopeApp {
    /// App with an optional dataset loaded up front.
    pub fn new(initial_file: Option<PathBuf>) -> Self {
        let mut state = AppState::default();
        if let Some(path) = initial_file {
            state.load_path(&path);
        }
        Self { state }
    }
}

impl eframe::App for TrendscopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: manual filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(230.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            charts::central_panel(ui, &mut self.state);
        });
    }
}
