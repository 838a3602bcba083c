use serde::{Deserialize, Serialize};

use crate::layer::{Layer, LayerId};

/// Elevation source feeding the terrain mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainSource {
    pub id: LayerId,
    pub url: String,
    pub tile_size: u32,
    pub max_zoom: u8,
    /// Vertical exaggeration applied to the mesh.
    pub exaggeration: f64,
}

impl Default for TerrainSource {
    fn default() -> Self {
        Self {
            id: LayerId("mapbox-dem".to_string()),
            url: "mapbox://mapbox.mapbox-terrain-dem-v1".to_string(),
            tile_size: 512,
            max_zoom: 14,
            exaggeration: 2.0,
        }
    }
}

impl Layer for TerrainSource {
    fn id(&self) -> &LayerId {
        &self.id
    }
}

/// Extruded building footprints shown at close zoom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingsLayer {
    pub id: LayerId,
    pub source: String,
    pub source_layer: String,
    pub min_zoom: u8,
    pub color: String,
    pub opacity: f64,
}

impl Default for BuildingsLayer {
    fn default() -> Self {
        Self {
            id: LayerId("3d-buildings".to_string()),
            source: "composite".to_string(),
            source_layer: "building".to_string(),
            min_zoom: 15,
            color: "#aaa".to_string(),
            opacity: 0.8,
        }
    }
}

impl Layer for BuildingsLayer {
    fn id(&self) -> &LayerId {
        &self.id
    }
}
