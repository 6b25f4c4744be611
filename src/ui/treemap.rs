use std::collections::BTreeMap;

use eframe::egui::{Pos2, Rect, Vec2};

// ---------------------------------------------------------------------------
// Squarified treemap layout
// ---------------------------------------------------------------------------

/// One positioned item tile.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemTile {
    pub rect: Rect,
    pub item: String,
    pub value: f64,
}

/// One positioned category frame with its nested item tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTile {
    pub rect: Rect,
    pub category: String,
    pub total: f64,
    pub items: Vec<ItemTile>,
}

/// Height of the category header band, when the frame is tall enough.
pub const HEADER_HEIGHT: f32 = 18.0;

/// Lay out the two-level sales hierarchy inside `bounds`. Tile areas are
/// proportional to summed purchase amounts. Zero-valued entries have no
/// area to claim and are left out; an all-zero hierarchy yields an empty
/// layout.
pub fn layout_hierarchy(
    hierarchy: &BTreeMap<String, BTreeMap<String, f64>>,
    bounds: Rect,
) -> Vec<CategoryTile> {
    let mut categories: Vec<(String, f64)> = hierarchy
        .iter()
        .map(|(category, items)| (category.clone(), items.values().sum::<f64>()))
        .filter(|(_, total)| *total > 0.0)
        .collect();
    // Squarify wants descending weights.
    categories.sort_by(|a, b| b.1.total_cmp(&a.1));

    let weights: Vec<f64> = categories.iter().map(|(_, total)| *total).collect();
    let frames = squarify(&weights, bounds);

    categories
        .into_iter()
        .zip(frames)
        .map(|((category, total), rect)| {
            let mut items: Vec<(String, f64)> = hierarchy[&category]
                .iter()
                .filter(|(_, value)| **value > 0.0)
                .map(|(item, value)| (item.clone(), *value))
                .collect();
            items.sort_by(|a, b| b.1.total_cmp(&a.1));

            let item_weights: Vec<f64> = items.iter().map(|(_, value)| *value).collect();
            let item_rects = squarify(&item_weights, item_area(rect));
            let items = items
                .into_iter()
                .zip(item_rects)
                .map(|((item, value), rect)| ItemTile { rect, item, value })
                .collect();

            CategoryTile {
                rect,
                category,
                total,
                items,
            }
        })
        .collect()
}

/// The rect left for item tiles below the category header band.
pub fn item_area(frame: Rect) -> Rect {
    if frame.height() > HEADER_HEIGHT * 2.0 {
        Rect::from_min_max(
            Pos2::new(frame.min.x, frame.min.y + HEADER_HEIGHT),
            frame.max,
        )
    } else {
        frame
    }
}

/// The item tile under `pos`, if any.
pub fn hit_item<'a>(tiles: &'a [CategoryTile], pos: Pos2) -> Option<&'a ItemTile> {
    tiles
        .iter()
        .flat_map(|category| category.items.iter())
        .find(|tile| tile.rect.contains(pos))
}

/// Squarified layout (Bruls et al.): split `bounds` into one rect per
/// weight, areas proportional to the weights, preferring near-square
/// aspect ratios. Weights must be positive, sorted descending.
pub fn squarify(weights: &[f64], bounds: Rect) -> Vec<Rect> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return Vec::new();
    }

    // Work in areas scaled to fill the bounding rect exactly.
    let scale = f64::from(bounds.width()) * f64::from(bounds.height()) / total;
    let mut pending: Vec<f64> = weights.iter().map(|w| w * scale).collect();
    pending.reverse();

    let mut rects = Vec::with_capacity(weights.len());
    let mut free = bounds;
    let mut row: Vec<f64> = Vec::new();

    while let Some(area) = pending.pop() {
        let side = f64::from(free.width().min(free.height()));
        if row.is_empty() || worst(&row, Some(area), side) <= worst(&row, None, side) {
            row.push(area);
        } else {
            layout_row(&row, &mut free, &mut rects);
            row.clear();
            // Retry this area against the shrunk free rect.
            pending.push(area);
        }
    }
    if !row.is_empty() {
        layout_row(&row, &mut free, &mut rects);
    }
    rects
}

/// Worst (largest) aspect ratio in the row, optionally with a candidate
/// appended, when laid along a side of the given length.
fn worst(row: &[f64], candidate: Option<f64>, side: f64) -> f64 {
    let sum: f64 = row.iter().sum::<f64>() + candidate.unwrap_or(0.0);
    if sum <= 0.0 || side <= 0.0 {
        return f64::INFINITY;
    }
    let side_sq = side * side;
    let sum_sq = sum * sum;
    row.iter()
        .copied()
        .chain(candidate)
        .map(|area| (side_sq * area / sum_sq).max(sum_sq / (side_sq * area)))
        .fold(0.0, f64::max)
}

/// Fix the current row as one strip along the shorter side of `free` and
/// shrink `free` by the strip.
fn layout_row(row: &[f64], free: &mut Rect, rects: &mut Vec<Rect>) {
    let sum: f64 = row.iter().sum();
    if sum <= 0.0 {
        return;
    }

    if free.width() < free.height() {
        // Horizontal strip across the top.
        let strip_h = (sum / f64::from(free.width())) as f32;
        let mut x = free.min.x;
        for &area in row {
            let w = ((area / sum) as f32) * free.width();
            rects.push(Rect::from_min_size(
                Pos2::new(x, free.min.y),
                Vec2::new(w, strip_h),
            ));
            x += w;
        }
        free.min.y += strip_h;
    } else {
        // Vertical strip along the left.
        let strip_w = (sum / f64::from(free.height())) as f32;
        let mut y = free.min.y;
        for &area in row {
            let h = ((area / sum) as f32) * free.height();
            rects.push(Rect::from_min_size(
                Pos2::new(free.min.x, y),
                Vec2::new(strip_w, h),
            ));
            y += h;
        }
        free.min.x += strip_w;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
