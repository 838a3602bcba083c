use std::collections::BTreeMap;
use std::fmt;

use formats::{RiskCategory, RiskDataset, RiskFeature};
use serde::{Deserialize, Serialize};

use crate::symbology::{LayerStyle, Palette};

/// Identifier of a layer or source on a map surface.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

pub trait Layer {
    fn id(&self) -> &LayerId;
}

/// Names a category layer uses on each surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLayerIds {
    /// GeoJSON source on the terrain map.
    pub source: LayerId,
    /// Fill layer on the terrain map.
    pub fill: LayerId,
    /// Outline layer on the terrain map.
    pub border: LayerId,
    /// CSS class for zone paths on the tile map.
    pub class_name: String,
}

impl CategoryLayerIds {
    pub fn for_category(category: RiskCategory) -> Self {
        let slug = category.slug();
        let fill = format!("landslide-layer-{slug}");
        Self {
            source: LayerId(format!("landslide-{slug}")),
            border: LayerId(format!("{fill}-border")),
            fill: LayerId(fill),
            class_name: format!("risk-zone-{slug}"),
        }
    }
}

/// Zones of one risk category, drawn as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryLayer {
    pub category: RiskCategory,
    pub ids: CategoryLayerIds,
    pub features: RiskDataset,
    pub style: LayerStyle,
}

impl CategoryLayer {
    pub fn new(category: RiskCategory, features: Vec<RiskFeature>, style: LayerStyle) -> Self {
        Self {
            category,
            ids: CategoryLayerIds::for_category(category),
            features: RiskDataset::from_features(features),
            style,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Builds one layer per colored, layered category in the partition.
    ///
    /// Categories without a color (No Risk) never get a layer. Empty
    /// categories are included; callers decide whether to attach them.
    pub fn build_all(
        partition: &BTreeMap<RiskCategory, Vec<&RiskFeature>>,
        palette: &Palette,
        visible: impl Fn(RiskCategory) -> bool,
        fill_opacity: f64,
        stroke_opacity: f64,
    ) -> Vec<CategoryLayer> {
        RiskCategory::LAYERED
            .into_iter()
            .filter_map(|category| {
                let color = palette.color(category)?;
                let features = partition
                    .get(&category)
                    .map(|fs| fs.iter().map(|f| (*f).clone()).collect())
                    .unwrap_or_default();
                let style = LayerStyle::new(color, fill_opacity, stroke_opacity, visible(category));
                Some(CategoryLayer::new(category, features, style))
            })
            .collect()
    }
}

impl Layer for CategoryLayer {
    fn id(&self) -> &LayerId {
        &self.ids.fill
    }
}
