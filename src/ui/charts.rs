use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, TAU};

use eframe::egui::{
    Align2, Color32, FontId, Pos2, Rect, RichText, ScrollArea, Sense, Shape, Stroke, StrokeKind,
    Ui, Vec2,
};
use egui_plot::{Bar, BarChart, Plot, PlotPoint};

use crate::color::{self, CategoryColors};
use crate::data::aggregate::{ChartData, CorrelationMatrix, CORRELATION_FIELDS};
use crate::data::filter::InteractiveFilters;
use crate::data::model::PurchaseDataset;
use crate::state::{AppState, Session};
use crate::ui::treemap;

// ---------------------------------------------------------------------------
// Central panel – the four charts
// ---------------------------------------------------------------------------

/// A chart interaction, applied after drawing so the frame reads one
/// consistent snapshot throughout.
enum ChartAction {
    ToggleCategory(String),
    ClearCategories,
    ToggleItem(String),
    ClearItems,
    ToggleAgeGroup(&'static str),
    ClearAgeGroups,
}

/// Render the central chart area.
pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    let Some(session) = state.session.as_mut() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a shopping data file to explore trends  (File → Open…)");
        });
        return;
    };

    let mut action = None;
    match &session.charts {
        Ok(charts) => {
            let colors = CategoryColors::new(&session.dataset.categories);
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    action = draw_charts(
                        ui,
                        charts,
                        &session.dataset,
                        &session.selections.interactive,
                        &colors,
                    );
                });
        }
        Err(_) => {
            ui.add_space(32.0);
            ui.vertical_centered(|ui: &mut Ui| {
                ui.heading("No data matches the current filters");
                ui.label(
                    "Relax the manual filters or clear the chart selections in the sidebar.",
                );
            });
        }
    }

    if let Some(action) = action {
        apply_action(session, action);
    }
}

fn apply_action(session: &mut Session, action: ChartAction) {
    match action {
        ChartAction::ToggleCategory(category) => session.toggle_category(&category),
        ChartAction::ClearCategories => session.clear_categories(),
        ChartAction::ToggleItem(item) => session.toggle_item(&item),
        ChartAction::ClearItems => session.clear_items(),
        ChartAction::ToggleAgeGroup(label) => session.toggle_age_group(label),
        ChartAction::ClearAgeGroups => session.clear_age_groups(),
    }
}

fn draw_charts(
    ui: &mut Ui,
    charts: &ChartData,
    dataset: &PurchaseDataset,
    interactive: &InteractiveFilters,
    colors: &CategoryColors,
) -> Option<ChartAction> {
    let mut action = None;

    ui.heading("Sales Distribution by Category");
    ui.add_space(4.0);
    ui.horizontal_top(|ui: &mut Ui| {
        category_donut(ui, &charts.category_totals, colors);
        ui.add_space(16.0);
        ui.vertical(|ui: &mut Ui| {
            ui.strong("Select categories:");
            // The checkbox column spans the full domain and doubles as the
            // donut legend.
            for category in &dataset.categories {
                let mut checked = interactive.categories.contains(category);
                let text = RichText::new(category).color(colors.color_for(category));
                if ui.checkbox(&mut checked, text).changed() {
                    action = Some(ChartAction::ToggleCategory(category.clone()));
                }
            }
            ui.add_space(4.0);
            if ui.button("Clear Category Selection").clicked() {
                action = Some(ChartAction::ClearCategories);
            }
        });
    });
    ui.add_space(8.0);
    ui.separator();

    ui.heading("Sales Hierarchy: Category and Item");
    ui.add_space(4.0);
    if let Some(hit) = sales_treemap(ui, &charts.sales_hierarchy, interactive, colors) {
        action = Some(hit);
    }
    ui.add_space(8.0);
    ui.separator();

    ui.heading("Purchase Amount by Age Group");
    ui.add_space(4.0);
    if let Some(hit) = age_group_bars(ui, &charts.age_group_totals, interactive) {
        action = Some(hit);
    }
    ui.add_space(8.0);
    ui.separator();

    ui.heading("Correlation of Numeric Columns");
    ui.add_space(4.0);
    match &charts.correlation {
        Ok(matrix) => correlation_heatmap(ui, matrix),
        Err(err) => {
            ui.label(
                RichText::new(format!("Not enough data for the correlation matrix ({err})."))
                    .italics(),
            );
        }
    }

    action
}

// ---------------------------------------------------------------------------
// Donut: sales per category
// ---------------------------------------------------------------------------

/// Donut of category totals. Slices big enough to hold text get an inline
/// label; the checkbox column next to it is the legend.
fn category_donut(ui: &mut Ui, totals: &BTreeMap<String, f64>, colors: &CategoryColors) {
    let (response, painter) = ui.allocate_painter(Vec2::splat(280.0), Sense::hover());
    let rect = response.rect;

    let total: f64 = totals.values().sum();
    if total <= 0.0 {
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            "All matching purchases total $0",
            FontId::proportional(13.0),
            ui.visuals().weak_text_color(),
        );
        return;
    }

    let center = rect.center();
    let outer = rect.width().min(rect.height()) * 0.5 - 4.0;
    let inner = outer * 0.45;

    let mut start = -FRAC_PI_2;
    for (category, &value) in totals {
        let frac = value / total;
        let sweep = frac * TAU;
        if sweep <= 0.0 {
            continue;
        }
        let fill = colors.color_for(category);

        // Tessellate the ring sector into thin quads.
        let steps = ((sweep / 0.04).ceil() as usize).max(1);
        for k in 0..steps {
            let a0 = start + sweep * k as f64 / steps as f64;
            let a1 = start + sweep * (k + 1) as f64 / steps as f64;
            let quad = vec![
                polar(center, outer, a0),
                polar(center, outer, a1),
                polar(center, inner, a1),
                polar(center, inner, a0),
            ];
            painter.add(Shape::convex_polygon(quad, fill, Stroke::NONE));
        }

        if frac >= 0.05 {
            let mid = start + sweep / 2.0;
            painter.text(
                polar(center, (outer + inner) * 0.5, mid),
                Align2::CENTER_CENTER,
                format!("{category}\n{:.1}%", frac * 100.0),
                FontId::proportional(12.0),
                color::contrast_text(fill),
            );
        }
        start += sweep;
    }
}

fn polar(center: Pos2, radius: f32, angle: f64) -> Pos2 {
    center + Vec2::new(angle.cos() as f32, angle.sin() as f32) * radius
}

// ---------------------------------------------------------------------------
// Treemap: sales per category and item
// ---------------------------------------------------------------------------

/// Squarified two-level treemap. Clicking an item tile toggles that item in
/// the interactive selection.
fn sales_treemap(
    ui: &mut Ui,
    hierarchy: &BTreeMap<String, BTreeMap<String, f64>>,
    interactive: &InteractiveFilters,
    colors: &CategoryColors,
) -> Option<ChartAction> {
    let mut action = None;

    let desired = Vec2::new(ui.available_width().max(320.0), 320.0);
    let (response, painter) = ui.allocate_painter(desired, Sense::click());
    let tiles = treemap::layout_hierarchy(hierarchy, response.rect.shrink(1.0));

    if tiles.is_empty() {
        painter.text(
            response.rect.center(),
            Align2::CENTER_CENTER,
            "All matching purchases total $0",
            FontId::proportional(13.0),
            ui.visuals().weak_text_color(),
        );
        return None;
    }

    for category in &tiles {
        let base = colors.color_for(&category.category);
        painter.rect_filled(category.rect, 0.0, base.gamma_multiply(0.25));
        painter.rect_stroke(
            category.rect,
            0.0,
            Stroke::new(1.0, base),
            StrokeKind::Inside,
        );
        if category.rect.height() > treemap::HEADER_HEIGHT * 2.0 && category.rect.width() > 60.0 {
            painter.text(
                Pos2::new(category.rect.min.x + 4.0, category.rect.min.y + 2.0),
                Align2::LEFT_TOP,
                format!("{}  (${:.0})", category.category, category.total),
                FontId::proportional(11.0),
                ui.visuals().strong_text_color(),
            );
        }

        for tile in &category.items {
            let selected = interactive.items.contains(&tile.item);
            let rect = tile.rect.shrink(1.0);
            if !rect.is_positive() {
                continue;
            }
            let fill = if selected {
                base
            } else {
                base.gamma_multiply(0.6)
            };
            painter.rect_filled(rect, 2.0, fill);
            if selected {
                painter.rect_stroke(
                    rect,
                    2.0,
                    Stroke::new(2.0, ui.visuals().strong_text_color()),
                    StrokeKind::Inside,
                );
            }
            if rect.width() > 56.0 && rect.height() > 28.0 {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    format!("{}\n${:.0}", tile.item, tile.value),
                    FontId::proportional(11.0),
                    color::contrast_text(fill),
                );
            }
        }
    }

    if response.clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            if let Some(tile) = treemap::hit_item(&tiles, pos) {
                action = Some(ChartAction::ToggleItem(tile.item.clone()));
            }
        }
    }

    if !interactive.items.is_empty() {
        ui.horizontal(|ui: &mut Ui| {
            let selected: Vec<String> = interactive.items.iter().cloned().collect();
            ui.label(format!("Selected items: {}", selected.join(", ")));
            if ui.button("Clear Item Selection").clicked() {
                action = Some(ChartAction::ClearItems);
            }
        });
    }

    action
}

// ---------------------------------------------------------------------------
// Bars: purchase amount per age group
// ---------------------------------------------------------------------------

/// Bar width in plot units; bars sit at integer x positions.
const BAR_WIDTH: f64 = 0.7;

/// Purchase totals per age bucket. Clicking a bar toggles that bucket in
/// the interactive selection.
fn age_group_bars(
    ui: &mut Ui,
    totals: &[(&'static str, f64)],
    interactive: &InteractiveFilters,
) -> Option<ChartAction> {
    let mut action = None;

    let bars: Vec<Bar> = totals
        .iter()
        .enumerate()
        .map(|(i, (label, total))| {
            let highlighted =
                interactive.age_groups.is_empty() || interactive.age_groups.contains(*label);
            let fill = if highlighted {
                Color32::from_rgb(96, 155, 219)
            } else {
                Color32::from_gray(100)
            };
            Bar::new(i as f64, *total)
                .name(*label)
                .width(BAR_WIDTH)
                .fill(fill)
        })
        .collect();

    let axis_labels: Vec<&'static str> = totals.iter().map(|(label, _)| *label).collect();

    let plot_response = Plot::new("age_group_totals")
        .height(240.0)
        .y_axis_label("Purchase Amount (USD)")
        .allow_boxed_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .show_x(false)
        .x_axis_formatter(move |mark, _range| {
            let index = mark.value.round();
            if index < 0.0 || (mark.value - index).abs() > 0.01 {
                return String::new();
            }
            axis_labels
                .get(index as usize)
                .copied()
                .unwrap_or("")
                .to_string()
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("Purchase Amount (USD)"));
            plot_ui.pointer_coordinate()
        });

    if plot_response.response.clicked() {
        if let Some(label) = plot_response
            .inner
            .and_then(|coord| hit_age_bar(coord, totals))
        {
            action = Some(ChartAction::ToggleAgeGroup(label));
        }
    }

    if !interactive.age_groups.is_empty() {
        ui.horizontal(|ui: &mut Ui| {
            let selected: Vec<String> = interactive.age_groups.iter().cloned().collect();
            ui.label(format!("Selected age groups: {}", selected.join(", ")));
            if ui.button("Clear Age Selection").clicked() {
                action = Some(ChartAction::ClearAgeGroups);
            }
        });
    }

    action
}

/// Map a pointer coordinate to the bar it lands on. A hit must be inside
/// the bar on both axes, not merely in its column.
fn hit_age_bar(coord: PlotPoint, totals: &[(&'static str, f64)]) -> Option<&'static str> {
    let index = coord.x.round();
    if index < 0.0 || (coord.x - index).abs() > BAR_WIDTH / 2.0 {
        return None;
    }
    let (label, total) = totals.get(index as usize).copied()?;
    let within = coord.y >= total.min(0.0) && coord.y <= total.max(0.0);
    within.then_some(label)
}

// ---------------------------------------------------------------------------
// Heatmap: correlation matrix
// ---------------------------------------------------------------------------

/// Display labels for [`CORRELATION_FIELDS`], in the same order.
fn heatmap_labels() -> [&'static str; 4] {
    ["Age", "Amount", "Rating", "Previous\nPurchases"]
}

/// Correlation heatmap on the diverging blue–white–red scale, with a small
/// scale bar underneath. Undefined cells render grey with "n/a".
fn correlation_heatmap(ui: &mut Ui, matrix: &CorrelationMatrix) {
    const CELL: f32 = 64.0;
    const LABEL_W: f32 = 96.0;
    const LABEL_H: f32 = 36.0;

    let n = CORRELATION_FIELDS.len();
    let grid = CELL * n as f32;
    let size = Vec2::new(LABEL_W + grid + 8.0, LABEL_H + grid + 28.0);
    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    let origin = response.rect.min + Vec2::new(LABEL_W, LABEL_H);
    let labels = heatmap_labels();

    for (j, label) in labels.iter().enumerate() {
        painter.text(
            Pos2::new(origin.x + (j as f32 + 0.5) * CELL, origin.y - 4.0),
            Align2::CENTER_BOTTOM,
            *label,
            FontId::proportional(11.0),
            ui.visuals().text_color(),
        );
    }

    for (i, label) in labels.iter().enumerate() {
        painter.text(
            Pos2::new(origin.x - 6.0, origin.y + (i as f32 + 0.5) * CELL),
            Align2::RIGHT_CENTER,
            *label,
            FontId::proportional(11.0),
            ui.visuals().text_color(),
        );
        for j in 0..n {
            let value = matrix.values[i][j];
            let cell = Rect::from_min_size(
                origin + Vec2::new(j as f32 * CELL, i as f32 * CELL),
                Vec2::splat(CELL),
            );
            let fill = color::diverging_color(value);
            painter.rect_filled(cell.shrink(1.0), 2.0, fill);

            let text = if value.is_nan() {
                "n/a".to_string()
            } else {
                format!("{value:.2}")
            };
            painter.text(
                cell.center(),
                Align2::CENTER_CENTER,
                text,
                FontId::monospace(12.0),
                color::contrast_text(fill),
            );
        }
    }

    // Scale bar, -1 on the left to +1 on the right.
    let bar_top = origin.y + grid + 8.0;
    let bar = Rect::from_min_size(Pos2::new(origin.x, bar_top), Vec2::new(grid, 8.0));
    let steps = 48;
    for k in 0..steps {
        let t = k as f64 / (steps - 1) as f64;
        let chunk = Rect::from_min_size(
            Pos2::new(bar.min.x + bar.width() * k as f32 / steps as f32, bar_top),
            Vec2::new(bar.width() / steps as f32 + 0.5, bar.height()),
        );
        painter.rect_filled(chunk, 0.0, color::diverging_color(t * 2.0 - 1.0));
    }
    painter.text(
        Pos2::new(bar.min.x - 6.0, bar.center().y),
        Align2::RIGHT_CENTER,
        "-1",
        FontId::proportional(10.0),
        ui.visuals().text_color(),
    );
    painter.text(
        Pos2::new(bar.max.x + 6.0, bar.center().y),
        Align2::LEFT_CENTER,
        "+1",
        FontId::proportional(10.0),
        ui.visuals().text_color(),
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TOTALS: [(&str, f64); 3] = [("18-25", 120.0), ("26-35", 40.0), ("36-45", 0.0)];

    #[test]
    fn bar_clicks_hit_only_inside_the_bar() {
        assert_eq!(
            hit_age_bar(PlotPoint::new(0.2, 60.0), &TOTALS),
            Some("18-25")
        );
        // The top corner of a bar still counts; the bounds are inclusive.
        assert_eq!(
            hit_age_bar(PlotPoint::new(0.35, 120.0), &TOTALS),
            Some("18-25")
        );
        assert_eq!(
            hit_age_bar(PlotPoint::new(1.0, 12.0), &TOTALS),
            Some("26-35")
        );
        // Right column, but above the bar: empty plot space.
        assert_eq!(hit_age_bar(PlotPoint::new(1.0, 90.0), &TOTALS), None);
    }

    #[test]
    fn clicks_between_or_beyond_bars_miss() {
        assert_eq!(hit_age_bar(PlotPoint::new(0.5, 10.0), &TOTALS), None);
        assert_eq!(hit_age_bar(PlotPoint::new(-0.6, 10.0), &TOTALS), None);
        assert_eq!(hit_age_bar(PlotPoint::new(3.0, 5.0), &TOTALS), None);
    }

    #[test]
    fn a_downward_bar_is_hit_below_the_axis() {
        let totals = [("18-25", -30.0)];
        assert_eq!(hit_age_bar(PlotPoint::new(0.0, -12.0), &totals), Some("18-25"));
        assert_eq!(hit_age_bar(PlotPoint::new(0.0, 12.0), &totals), None);
    }
}
