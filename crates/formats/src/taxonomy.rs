use serde::{Deserialize, Serialize};

/// Landslide risk categories, in ascending severity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    #[serde(rename = "No Risk")]
    None,
    Low,
    Moderate,
    High,
    Extreme,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 5] = [
        RiskCategory::None,
        RiskCategory::Low,
        RiskCategory::Moderate,
        RiskCategory::High,
        RiskCategory::Extreme,
    ];

    /// Categories that get a layer, a legend entry and a toggle.
    pub const LAYERED: [RiskCategory; 4] = [
        RiskCategory::Low,
        RiskCategory::Moderate,
        RiskCategory::High,
        RiskCategory::Extreme,
    ];

    /// Category assigned to features whose `risk_level` is missing or unknown.
    pub const FALLBACK: RiskCategory = RiskCategory::Low;

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::None => "No Risk",
            RiskCategory::Low => "Low",
            RiskCategory::Moderate => "Moderate",
            RiskCategory::High => "High",
            RiskCategory::Extreme => "Extreme",
        }
    }

    /// Lowercase, dash-separated form used in layer and element ids.
    pub fn slug(self) -> &'static str {
        match self {
            RiskCategory::None => "no-risk",
            RiskCategory::Low => "low",
            RiskCategory::Moderate => "moderate",
            RiskCategory::High => "high",
            RiskCategory::Extreme => "extreme",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Resolves a raw `risk_level` property value.
    pub fn classify(risk_level: Option<&str>) -> Self {
        risk_level
            .and_then(Self::from_label)
            .unwrap_or(Self::FALLBACK)
    }

    /// `None` means the category is never drawn.
    pub fn default_color(self) -> Option<&'static str> {
        match self {
            RiskCategory::None => None,
            RiskCategory::Low => Some("#90EE90"),
            RiskCategory::Moderate => Some("#FFD700"),
            RiskCategory::High => Some("#FF6347"),
            RiskCategory::Extreme => Some("#8B0000"),
        }
    }

    pub fn default_visible(self) -> bool {
        !matches!(self, RiskCategory::None)
    }

    pub fn is_layered(self) -> bool {
        !matches!(self, RiskCategory::None)
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
