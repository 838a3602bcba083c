use std::collections::BTreeMap;

use formats::RiskCategory;
use layers::symbology::Palette;
use serde::Serialize;

/// User-controlled overlay settings. Survives surface rebuilds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    visibility: BTreeMap<RiskCategory, bool>,
    opacity: f64,
}

impl ViewState {
    pub fn new(palette: &Palette, opacity: f64) -> Self {
        let visibility = RiskCategory::ALL
            .into_iter()
            .map(|c| (c, palette.default_visible(c)))
            .collect();
        Self {
            visibility,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }

    pub fn is_visible(&self, category: RiskCategory) -> bool {
        self.visibility.get(&category).copied().unwrap_or(false)
    }

    pub fn set_visible(&mut self, category: RiskCategory, visible: bool) {
        self.visibility.insert(category, visible);
    }

    /// Sets every layered category at once.
    pub fn set_all(&mut self, visible: bool) {
        for c in RiskCategory::LAYERED {
            self.visibility.insert(c, visible);
        }
    }

    pub fn any_visible(&self) -> bool {
        RiskCategory::LAYERED.into_iter().any(|c| self.is_visible(c))
    }

    pub fn all_visible(&self) -> bool {
        RiskCategory::LAYERED.into_iter().all(|c| self.is_visible(c))
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Clamped to `0.0..=1.0`; returns the stored value.
    pub fn set_opacity(&mut self, opacity: f64) -> f64 {
        self.opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };
        self.opacity
    }

    pub fn opacity_percent(&self) -> u32 {
        (self.opacity * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use formats::RiskCategory;
    use layers::symbology::Palette;

    use super::ViewState;

    #[test]
    fn starts_from_palette_defaults() {
        let s = ViewState::new(&Palette::default(), 0.6);
        assert!(!s.is_visible(RiskCategory::None));
        assert!(s.all_visible());
        assert_eq!(s.opacity_percent(), 60);
    }

    #[test]
    fn opacity_is_clamped() {
        let mut s = ViewState::new(&Palette::default(), 0.6);
        assert_eq!(s.set_opacity(1.7), 1.0);
        assert_eq!(s.set_opacity(-0.2), 0.0);
        assert_eq!(s.set_opacity(f64::NAN), 0.0);
    }

    #[test]
    fn set_all_leaves_no_risk_alone() {
        let mut s = ViewState::new(&Palette::default(), 0.6);
        s.set_all(false);
        assert!(!s.any_visible());
        s.set_all(true);
        assert!(s.all_visible());
        assert!(!s.is_visible(RiskCategory::None));
    }
}
