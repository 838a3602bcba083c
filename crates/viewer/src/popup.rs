use compute::hectares;
use formats::RiskFeature;
use layers::symbology::Palette;
use serde::Serialize;

use crate::surface::ViewMode;

const FALLBACK_COLOR: &str = "#666";

/// Contents of the popup shown when a zone is clicked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturePopup {
    pub title: String,
    pub color: String,
    /// e.g. `82.0%`.
    pub susceptibility: String,
    /// Hectares with two decimals, or `N/A`.
    pub area: String,
    pub classification: String,
    pub zone_id: String,
}

impl FeaturePopup {
    pub fn new(feature: &RiskFeature, palette: &Palette, mode: ViewMode) -> Self {
        let label = feature.category.label();
        let title = match mode {
            ViewMode::Planar => format!("{label} Risk Zone"),
            ViewMode::Perspective => format!("{label} Risk Zone (3D)"),
        };
        let area = match feature.area_sqm {
            Some(sqm) if sqm != 0.0 => format!("{:.2}", hectares(sqm)),
            _ => "N/A".to_string(),
        };
        Self {
            title,
            color: palette
                .color(feature.category)
                .unwrap_or(FALLBACK_COLOR)
                .to_string(),
            susceptibility: format!("{:.1}%", feature.susceptibility * 100.0),
            area,
            classification: label.to_string(),
            zone_id: feature.zone_id.clone().unwrap_or_else(|| "unknown".to_string()),
        }
    }

    pub fn to_html(&self) -> String {
        format!(
            concat!(
                "<div class=\"landslide-popup\">",
                "<h4 style=\"color: {color}; margin: 0 0 10px 0;\">{title}</h4>",
                "<div class=\"popup-row\"><strong>Susceptibility:</strong> {susc}</div>",
                "<div class=\"popup-row\"><strong>Area:</strong> {area} hectares</div>",
                "<div class=\"popup-row\"><strong>Risk Classification:</strong> {class}</div>",
                "<div class=\"popup-row\"><strong>Zone:</strong> {id}</div>",
                "</div>"
            ),
            color = escape(&self.color),
            title = escape(&self.title),
            susc = escape(&self.susceptibility),
            area = escape(&self.area),
            class = escape(&self.classification),
            id = escape(&self.zone_id),
        )
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
