use std::env;
use std::path::Path;
use std::time::Duration;

use foundation::{GeoBounds, LatLng};
use layers::raster::{BaseLayer, default_base_layers};
use layers::symbology::Palette;
use layers::terrain::{BuildingsLayer, TerrainSource};
use serde::{Deserialize, Serialize};

pub const ENV_CONFIG: &str = "RISKMAP_CONFIG";
pub const ENV_DATASET: &str = "RISKMAP_DATASET";
pub const ENV_MAPBOX_TOKEN: &str = "RISKMAP_MAPBOX_TOKEN";

pub const PLACEHOLDER_TOKEN: &str = "pk.YOUR_MAPBOX_TOKEN_HERE";
const TOKEN_PREFIX: &str = "pk.";
const TOKEN_MIN_LEN: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("no 3D map token configured")]
    Missing,
    #[error("3D map token is still the placeholder value")]
    Placeholder,
    #[error("3D map token is too short")]
    TooShort,
    #[error("3D map token must start with \"pk.\"")]
    WrongPrefix,
}

/// A public access token for the terrain provider.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn parse(raw: Option<&str>) -> Result<Self, CredentialError> {
        let token = raw.map(str::trim).unwrap_or_default();
        if token.is_empty() {
            return Err(CredentialError::Missing);
        }
        if token == PLACEHOLDER_TOKEN {
            return Err(CredentialError::Placeholder);
        }
        if token.len() < TOKEN_MIN_LEN {
            return Err(CredentialError::TooShort);
        }
        if !token.starts_with(TOKEN_PREFIX) {
            return Err(CredentialError::WrongPrefix);
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential(pk.***)")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanarConfig {
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub max_bounds: GeoBounds,
    /// 0.0 lets the map pan freely past the bounds, 1.0 makes them solid.
    pub bounds_viscosity: f64,
    pub base_layers: Vec<BaseLayer>,
}

impl Default for PlanarConfig {
    fn default() -> Self {
        Self {
            zoom: 14.0,
            min_zoom: 11.0,
            max_zoom: 20.0,
            max_bounds: GeoBounds::new(LatLng::new(16.8, 120.7), LatLng::new(17.4, 121.2)),
            bounds_viscosity: 0.5,
            base_layers: default_base_layers(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveConfig {
    /// Added to the planar zoom.
    pub zoom_offset: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub style: String,
    pub terrain: TerrainSource,
    pub buildings: BuildingsLayer,
    pub timeout_ms: u64,
}

impl Default for PerspectiveConfig {
    fn default() -> Self {
        Self {
            zoom_offset: -1.0,
            min_zoom: 8.0,
            max_zoom: 18.0,
            pitch: 60.0,
            bearing: 0.0,
            style: "mapbox://styles/mapbox/satellite-streets-v12".to_string(),
            terrain: TerrainSource::default(),
            buildings: BuildingsLayer::default(),
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub map_prefix: String,
    pub data_prefix: String,
    pub report_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            map_prefix: "bontoc_landslide_map".to_string(),
            data_prefix: "bontoc_landslide_data".to_string(),
            report_prefix: "landslide_analysis_report".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub center: LatLng,
    pub dataset_path: String,
    pub default_opacity: f64,
    pub palette: Palette,
    pub planar: PlanarConfig,
    pub perspective: PerspectiveConfig,
    pub export: ExportConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapbox_token: Option<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: LatLng::new(17.106079, 120.941031),
            dataset_path: "./data/landslide_susceptibility.geojson".to_string(),
            default_opacity: 0.6,
            palette: Palette::default(),
            planar: PlanarConfig::default(),
            perspective: PerspectiveConfig::default(),
            export: ExportConfig::default(),
            mapbox_token: None,
        }
    }
}

impl MapConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Defaults, or the file named by `RISKMAP_CONFIG`, with env overrides
    /// applied on top.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var(ENV_CONFIG) {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_DATASET) {
            self.dataset_path = path;
        }
        if let Some(token) = lookup(ENV_MAPBOX_TOKEN) {
            self.mapbox_token = Some(token);
        }
    }

    pub fn credential(&self) -> Result<Credential, CredentialError> {
        Credential::parse(self.mapbox_token.as_deref())
    }

    pub fn perspective_timeout(&self) -> Duration {
        Duration::from_millis(self.perspective.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use formats::RiskCategory;
    use pretty_assertions::assert_eq;

    use super::{Credential, CredentialError, ENV_DATASET, ENV_MAPBOX_TOKEN, MapConfig};

    #[test]
    fn defaults_match_bontoc_view() {
        let c = MapConfig::default();
        assert_eq!(c.center.lat, 17.106079);
        assert_eq!(c.planar.zoom, 14.0);
        assert_eq!(c.planar.max_bounds.north_east.lng, 121.2);
        assert_eq!(c.perspective.timeout_ms, 30_000);
        assert_eq!(c.palette.color(RiskCategory::Extreme), Some("#8B0000"));
        assert!(c.mapbox_token.is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = MapConfig::from_json_str(
            r#"{"dataset_path": "zones.geojson", "planar": {"zoom": 12}}"#,
        )
        .unwrap();
        assert_eq!(c.dataset_path, "zones.geojson");
        assert_eq!(c.planar.zoom, 12.0);
        assert_eq!(c.planar.min_zoom, 11.0);
        assert_eq!(c.default_opacity, 0.6);
    }

    #[test]
    fn overrides_replace_dataset_and_token() {
        let vars: BTreeMap<&str, &str> = [
            (ENV_DATASET, "/srv/zones.geojson"),
            (ENV_MAPBOX_TOKEN, "pk.abcdefghijkl"),
        ]
        .into_iter()
        .collect();
        let mut c = MapConfig::default();
        c.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(c.dataset_path, "/srv/zones.geojson");
        assert_eq!(c.credential().unwrap().as_str(), "pk.abcdefghijkl");
    }

    #[test]
    fn credential_rules() {
        assert_eq!(Credential::parse(None), Err(CredentialError::Missing));
        assert_eq!(Credential::parse(Some("  ")), Err(CredentialError::Missing));
        assert_eq!(
            Credential::parse(Some("pk.YOUR_MAPBOX_TOKEN_HERE")),
            Err(CredentialError::Placeholder)
        );
        assert_eq!(Credential::parse(Some("pk.abc")), Err(CredentialError::TooShort));
        assert_eq!(
            Credential::parse(Some("sk.abcdefghijkl")),
            Err(CredentialError::WrongPrefix)
        );
        assert!(Credential::parse(Some("pk.eyJ1Ijoi")).is_ok());
    }

    #[test]
    fn credential_debug_hides_token() {
        let c = Credential::parse(Some("pk.secretsecret")).unwrap();
        assert!(!format!("{c:?}").contains("secret"));
    }
}
