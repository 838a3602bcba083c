use std::collections::BTreeMap;

use formats::RiskCategory;
use serde::{Deserialize, Serialize};

/// Stroke opacity of zone outlines on the tile map.
pub const PLANAR_STROKE_OPACITY: f64 = 0.3;
/// Stroke opacity of zone outlines on the terrain map.
pub const PERSPECTIVE_STROKE_OPACITY: f64 = 0.8;
pub const STROKE_WEIGHT: f64 = 1.0;
pub const HIGHLIGHT_STROKE_WEIGHT: f64 = 3.0;
/// Added to the fill opacity while a zone is hovered.
pub const HIGHLIGHT_OPACITY_BOOST: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySymbol {
    /// `None` keeps the category off every surface.
    pub color: Option<String>,
    pub visible: bool,
}

/// Per-category colors and default visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    symbols: BTreeMap<RiskCategory, CategorySymbol>,
}

impl Default for Palette {
    fn default() -> Self {
        let symbols = RiskCategory::ALL
            .into_iter()
            .map(|c| {
                (
                    c,
                    CategorySymbol {
                        color: c.default_color().map(str::to_string),
                        visible: c.default_visible(),
                    },
                )
            })
            .collect();
        Self { symbols }
    }
}

impl Palette {
    pub fn color(&self, category: RiskCategory) -> Option<&str> {
        match self.symbols.get(&category) {
            Some(s) => s.color.as_deref(),
            None => category.default_color(),
        }
    }

    pub fn default_visible(&self, category: RiskCategory) -> bool {
        self.symbols
            .get(&category)
            .map(|s| s.visible)
            .unwrap_or_else(|| category.default_visible())
    }

    pub fn set(&mut self, category: RiskCategory, symbol: CategorySymbol) {
        self.symbols.insert(category, symbol);
    }

    /// Legend rows: every layered category with a color.
    pub fn legend(&self) -> Vec<(RiskCategory, &str)> {
        RiskCategory::LAYERED
            .into_iter()
            .filter_map(|c| self.color(c).map(|color| (c, color)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    pub visible: bool,
    pub color: String,
    pub fill_opacity: f64,
    pub stroke_weight: f64,
    pub stroke_opacity: f64,
}

impl LayerStyle {
    pub fn new(color: impl Into<String>, fill_opacity: f64, stroke_opacity: f64, visible: bool) -> Self {
        Self {
            visible,
            color: color.into(),
            fill_opacity: fill_opacity.clamp(0.0, 1.0),
            stroke_weight: STROKE_WEIGHT,
            stroke_opacity,
        }
    }

    /// Fill opacity as painted; hidden layers paint fully transparent.
    pub fn effective_fill_opacity(&self) -> f64 {
        if self.visible { self.fill_opacity } else { 0.0 }
    }

    pub fn effective_stroke_opacity(&self) -> f64 {
        if self.visible { self.stroke_opacity } else { 0.0 }
    }

    /// Style applied while the pointer is over a zone.
    pub fn highlighted(&self) -> Self {
        Self {
            visible: self.visible,
            color: self.color.clone(),
            fill_opacity: (self.fill_opacity + HIGHLIGHT_OPACITY_BOOST).min(1.0),
            stroke_weight: HIGHLIGHT_STROKE_WEIGHT,
            stroke_opacity: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use formats::RiskCategory;

    use super::{CategorySymbol, LayerStyle, Palette};

    #[test]
    fn default_palette_matches_taxonomy() {
        let p = Palette::default();
        assert_eq!(p.color(RiskCategory::High), Some("#FF6347"));
        assert_eq!(p.color(RiskCategory::None), None);
        assert!(!p.default_visible(RiskCategory::None));
        assert!(p.default_visible(RiskCategory::Extreme));
    }

    #[test]
    fn legend_skips_no_risk() {
        let p = Palette::default();
        let labels: Vec<_> = p.legend().into_iter().map(|(c, _)| c.label()).collect();
        assert_eq!(labels, vec!["Low", "Moderate", "High", "Extreme"]);
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut p = Palette::default();
        p.set(
            RiskCategory::Low,
            CategorySymbol {
                color: Some("#00FF00".to_string()),
                visible: false,
            },
        );
        assert_eq!(p.color(RiskCategory::Low), Some("#00FF00"));
        assert!(!p.default_visible(RiskCategory::Low));
    }

    #[test]
    fn palette_deserializes_from_label_keys() {
        let p: Palette = serde_json::from_str(
            r##"{"High": {"color": "#123456", "visible": true}, "No Risk": {"color": null, "visible": false}}"##,
        )
        .unwrap();
        assert_eq!(p.color(RiskCategory::High), Some("#123456"));
        // Categories missing from the table fall back to the taxonomy.
        assert_eq!(p.color(RiskCategory::Low), Some("#90EE90"));
    }

    #[test]
    fn highlight_boosts_and_caps_opacity() {
        let s = LayerStyle::new("#FFD700", 0.9, 0.3, true);
        let h = s.highlighted();
        assert_eq!(h.fill_opacity, 1.0);
        assert_eq!(h.stroke_weight, 3.0);
        assert_eq!(h.stroke_opacity, 1.0);
    }

    #[test]
    fn hidden_layers_paint_transparent() {
        let s = LayerStyle::new("#FFD700", 0.6, 0.8, false);
        assert_eq!(s.effective_fill_opacity(), 0.0);
        assert_eq!(s.effective_stroke_opacity(), 0.0);
    }
}
