use serde::{Deserialize, Serialize};

use crate::layer::{Layer, LayerId};

/// A raster tile base map selectable from the layer switcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseLayer {
    /// Name shown in the switcher; doubles as the id.
    pub name: LayerId,
    pub url_template: String,
    pub attribution: String,
    pub max_zoom: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomains: Option<String>,
}

impl BaseLayer {
    fn new(name: &str, url_template: &str, attribution: &str, max_zoom: u8) -> Self {
        Self {
            name: LayerId(name.to_string()),
            url_template: url_template.to_string(),
            attribution: attribution.to_string(),
            max_zoom,
            subdomains: None,
        }
    }
}

impl Layer for BaseLayer {
    fn id(&self) -> &LayerId {
        &self.name
    }
}

/// Base maps in switcher order; the first one is shown at start.
pub fn default_base_layers() -> Vec<BaseLayer> {
    let mut clean = BaseLayer::new(
        "Clean Terrain",
        "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
        "© OpenStreetMap © CartoDB",
        19,
    );
    clean.subdomains = Some("abcd".to_string());

    vec![
        BaseLayer::new(
            "Topographic",
            "https://server.arcgisonline.com/ArcGIS/rest/services/World_Topo_Map/MapServer/tile/{z}/{y}/{x}",
            "© Esri, HERE, Garmin, FAO, NOAA, USGS",
            16,
        ),
        BaseLayer::new(
            "Satellite Imagery",
            "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
            "© Esri, Maxar, GeoEye, Earthstar Geographics",
            19,
        ),
        BaseLayer::new(
            "Detailed Topo",
            "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
            "© OpenTopoMap (CC-BY-SA)",
            17,
        ),
        clean,
        BaseLayer::new(
            "OpenStreetMap",
            "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            "© OpenStreetMap contributors",
            19,
        ),
    ]
}
