use std::collections::BTreeSet;

use eframe::egui::{self, Color32, RichText, ScrollArea, Slider, Ui};

use crate::state::{AppState, Session};

// ---------------------------------------------------------------------------
// Left side panel – manual filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    // ---- Logo (centered) ----
    let logo = egui::include_image!("../../assets/logo.png");
    ui.vertical_centered(|ui: &mut Ui| {
        ui.add(
            egui::Image::new(logo)
                .max_width(ui.available_width() * 0.8)
                .max_height(120.0)
                .corner_radius(4.0),
        );
    });
    ui.add_space(4.0);

    ui.heading("Filters");
    ui.separator();

    let Some(session) = state.session.as_mut() else {
        ui.label("No dataset loaded.");
        return;
    };

    if ui.button("Reset All Filters").clicked() {
        session.reset_all();
    }
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // Edit a draft of the manual layer and commit once, so one
            // changed widget means one recompute.
            let mut manual = session.selections.manual.clone();
            let mut changed = false;

            changed |= value_filter(ui, "Gender", &session.dataset.genders, &mut manual.genders);
            changed |= value_filter(ui, "Season", &session.dataset.seasons, &mut manual.seasons);
            changed |= value_filter(
                ui,
                "Category",
                &session.dataset.categories,
                &mut manual.categories,
            );

            ui.add_space(4.0);
            changed |= age_range(ui, session.dataset.age_span, &mut manual.age_range);
            ui.add_space(4.0);
            changed |= amount_range(ui, session.dataset.amount_span, &mut manual.amount_range);

            if changed {
                session.set_manual_filters(manual);
            }

            ui.separator();
            interactive_summary(ui, session);

            ui.separator();
            ui.strong("Filtered Records");
            ui.label(format!(
                "{} / {}",
                session.views.visible.len(),
                session.dataset.len()
            ));
        });
}

/// One collapsible multiselect over a value domain. Returns true when the
/// selection changed. An emptied selection admits no records at all.
fn value_filter(
    ui: &mut Ui,
    label: &str,
    domain: &BTreeSet<String>,
    selected: &mut BTreeSet<String>,
) -> bool {
    let mut changed = false;
    let header_text = format!("{label}  ({}/{})", selected.len(), domain.len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(label)
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    *selected = domain.clone();
                    changed = true;
                }
                if ui.small_button("None").clicked() {
                    selected.clear();
                    changed = true;
                }
            });

            for value in domain {
                let mut checked = selected.contains(value);
                if ui.checkbox(&mut checked, value.as_str()).changed() {
                    if checked {
                        selected.insert(value.clone());
                    } else {
                        selected.remove(value);
                    }
                    changed = true;
                }
            }
        });

    changed
}

/// Inclusive [min, max] age bounds. Dragging one thumb past the other drags
/// the other along, so the range stays ordered.
fn age_range(ui: &mut Ui, span: (i64, i64), range: &mut (i64, i64)) -> bool {
    ui.strong("Age Range");
    let moved_min = ui
        .add(Slider::new(&mut range.0, span.0..=span.1).text("min"))
        .changed();
    if moved_min && range.0 > range.1 {
        range.1 = range.0;
    }
    let moved_max = ui
        .add(Slider::new(&mut range.1, span.0..=span.1).text("max"))
        .changed();
    if moved_max && range.1 < range.0 {
        range.0 = range.1;
    }
    moved_min || moved_max
}

/// Inclusive [min, max] purchase-amount bounds.
fn amount_range(ui: &mut Ui, span: (f64, f64), range: &mut (f64, f64)) -> bool {
    ui.strong("Purchase Amount (USD)");
    let moved_min = ui
        .add(Slider::new(&mut range.0, span.0..=span.1).text("min"))
        .changed();
    if moved_min && range.0 > range.1 {
        range.1 = range.0;
    }
    let moved_max = ui
        .add(Slider::new(&mut range.1, span.0..=span.1).text("max"))
        .changed();
    if moved_max && range.1 < range.0 {
        range.0 = range.1;
    }
    moved_min || moved_max
}

/// Chart-driven selections at a glance, with per-set clear buttons.
fn interactive_summary(ui: &mut Ui, session: &mut Session) {
    ui.strong("Chart Selections");
    if !session.selections.interactive.any_active() {
        ui.weak("None. Click on chart elements to drill down.");
        return;
    }

    let interactive = session.selections.interactive.clone();
    if !interactive.categories.is_empty() {
        ui.horizontal_wrapped(|ui: &mut Ui| {
            ui.label(format!("Categories: {}", join(&interactive.categories)));
            if ui.small_button("Clear").clicked() {
                session.clear_categories();
            }
        });
    }
    if !interactive.items.is_empty() {
        ui.horizontal_wrapped(|ui: &mut Ui| {
            ui.label(format!("Items: {}", join(&interactive.items)));
            if ui.small_button("Clear").clicked() {
                session.clear_items();
            }
        });
    }
    if !interactive.age_groups.is_empty() {
        ui.horizontal_wrapped(|ui: &mut Ui| {
            ui.label(format!("Age groups: {}", join(&interactive.age_groups)));
            if ui.small_button("Clear").clicked() {
                session.clear_age_groups();
            }
        });
    }
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join(", ")
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

        if let Some(session) = &state.session {
            ui.label(format!(
                "{} records loaded, {} match the current filters",
                session.dataset.len(),
                session.views.visible.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open shopping data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}
