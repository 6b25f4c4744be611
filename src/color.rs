use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: category → Color32
// ---------------------------------------------------------------------------

/// Maps each category of the loaded dataset to a distinct colour, shared by
/// the donut, the treemap and the category checkboxes.
#[derive(Debug, Clone)]
pub struct CategoryColors {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl CategoryColors {
    /// Build the category → colour table from the dataset's category domain.
    pub fn new(categories: &BTreeSet<String>) -> Self {
        let palette = generate_palette(categories.len());
        let mapping: BTreeMap<String, Color32> = categories
            .iter()
            .zip(palette.into_iter())
            .map(|(category, color)| (category.clone(), color))
            .collect();

        CategoryColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a category.
    pub fn color_for(&self, category: &str) -> Color32 {
        self.mapping
            .get(category)
            .copied()
            .unwrap_or(self.default_color)
    }
}

// ---------------------------------------------------------------------------
// Diverging scale for correlations
// ---------------------------------------------------------------------------

/// Blue → white → red scale for correlation values in [-1, 1]. NaN (an
/// undefined correlation) renders as neutral grey.
pub fn diverging_color(value: f64) -> Color32 {
    if value.is_nan() {
        return Color32::from_gray(70);
    }
    let t = ((value.clamp(-1.0, 1.0) + 1.0) / 2.0) as f32;

    let negative = LinSrgb::new(0.015f32, 0.14, 0.38);
    let midpoint = LinSrgb::new(0.92f32, 0.92, 0.94);
    let positive = LinSrgb::new(0.45f32, 0.01, 0.05);

    let mixed = if t < 0.5 {
        negative.mix(midpoint, t * 2.0)
    } else {
        midpoint.mix(positive, (t - 0.5) * 2.0)
    };
    let rgb: Srgb = Srgb::from_linear(mixed);
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

/// Readable text colour (black or white) on top of `fill`.
pub fn contrast_text(fill: Color32) -> Color32 {
    let luma = 0.299 * fill.r() as f32 + 0.587 * fill.g() as f32 + 0.114 * fill.b() as f32;
    if luma > 140.0 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}
