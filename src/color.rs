use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};

use crate::data::model::CellValue;

// ---------------------------------------------------------------------------
// Chart themes
// ---------------------------------------------------------------------------

/// Visual preset applied to a chart.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theme {
    /// Bright, saturated hues on a light grey background.
    #[default]
    Simple,
    /// Soft, desaturated hues.
    Muted,
    /// Strong hues on plain white without grid lines.
    Solid,
}

impl Theme {
    pub const ALL: [Self; 3] = [Self::Simple, Self::Muted, Self::Solid];

    pub fn label(self) -> &'static str {
        match self {
            Theme::Simple => "Simple colors",
            Theme::Muted => "Muted colors",
            Theme::Solid => "Solid colors",
        }
    }

    /// (saturation, lightness) used for every generated hue.
    fn hsl_params(self) -> (f32, f32) {
        match self {
            Theme::Simple => (0.75, 0.55),
            Theme::Muted => (0.35, 0.60),
            Theme::Solid => (0.90, 0.42),
        }
    }

    pub fn background(self) -> Color32 {
        match self {
            Theme::Simple => Color32::from_rgb(229, 236, 246),
            Theme::Muted => Color32::from_rgb(234, 234, 242),
            Theme::Solid => Color32::WHITE,
        }
    }

    pub fn show_grid(self) -> bool {
        !matches!(self, Theme::Solid)
    }

    /// `n` visually distinct colours for this theme.
    pub fn palette(self, n: usize) -> Vec<Color32> {
        let (saturation, lightness) = self.hsl_params();
        generate_palette(n, saturation, lightness)
    }
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize, saturation: f32, lightness: f32) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, saturation, lightness);
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
// Color mapping: group value → Color32
// ---------------------------------------------------------------------------

/// Maps the distinct values of a colour-grouping column to theme colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<CellValue, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(theme: Theme, unique_values: &BTreeSet<CellValue>) -> Self {
        let palette = theme.palette(unique_values.len());
        let mapping = unique_values
            .iter()
            .cloned()
            .zip(palette)
            .collect();
        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given value; unknown values are grey.
    pub fn color_for(&self, value: &CellValue) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_map_assigns_palette_in_value_order() {
        let values: BTreeSet<CellValue> = ["Norte", "Centro"]
            .iter()
            .map(|s| CellValue::Text(s.to_string()))
            .collect();
        let map = ColorMap::new(Theme::Simple, &values);
        let palette = Theme::Simple.palette(2);
        assert_eq!(map.color_for(&CellValue::Text("Centro".into())), palette[0]);
        assert_eq!(map.color_for(&CellValue::Text("Norte".into())), palette[1]);
        assert_eq!(map.color_for(&CellValue::Null), Color32::GRAY);
    }

    #[test]
    fn palette_has_requested_size_and_distinct_colors() {
        for theme in Theme::ALL {
            let colors = theme.palette(6);
            assert_eq!(colors.len(), 6);
            for (i, a) in colors.iter().enumerate() {
                for b in &colors[i + 1..] {
                    assert_ne!(a, b, "{theme:?} repeats a colour");
                }
            }
        }
        assert!(Theme::Simple.palette(0).is_empty());
    }

    #[test]
    fn themes_differ() {
        assert_ne!(Theme::Simple.palette(3), Theme::Muted.palette(3));
        assert_ne!(Theme::Muted.palette(3), Theme::Solid.palette(3));
        assert!(!Theme::Solid.show_grid());
    }
}
