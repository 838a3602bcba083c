use foundation::{GeoBounds, LatLng};
use serde_json::{Map, Value};

use crate::taxonomy::RiskCategory;

pub const PROP_RISK_LEVEL: &str = "risk_level";
pub const PROP_SUSCEPTIBILITY: &str = "susceptibility_avg";
pub const PROP_AREA_SQM: &str = "area_sqm";
pub const PROP_ID: &str = "id";

/// A linear ring of positions. Closing duplicates are kept as given.
pub type Ring = Vec<LatLng>;

#[derive(Debug, Clone, PartialEq)]
pub enum RiskGeometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl RiskGeometry {
    pub fn rings(&self) -> Box<dyn Iterator<Item = &Ring> + '_> {
        match self {
            RiskGeometry::Polygon(rings) => Box::new(rings.iter()),
            RiskGeometry::MultiPolygon(polys) => Box::new(polys.iter().flatten()),
        }
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_points(self.rings().flatten().copied())
    }
}

/// One risk-zone polygon.
///
/// The typed fields are derived from `properties` when the feature is parsed.
/// `properties`, `feature_id` and `foreign_members` are kept verbatim so the
/// dataset can be written back out unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskFeature {
    pub category: RiskCategory,
    /// 0.0..=1.0; 0.0 when absent.
    pub susceptibility: f64,
    pub area_sqm: Option<f64>,
    /// `properties.id`, falling back to the GeoJSON feature id.
    pub zone_id: Option<String>,
    pub geometry: RiskGeometry,
    pub properties: Map<String, Value>,
    pub feature_id: Option<Value>,
    pub foreign_members: Map<String, Value>,
}

impl RiskFeature {
    pub fn new(properties: Map<String, Value>, geometry: RiskGeometry) -> Self {
        let category = RiskCategory::classify(properties.get(PROP_RISK_LEVEL).and_then(|v| v.as_str()));
        let susceptibility = properties
            .get(PROP_SUSCEPTIBILITY)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let area_sqm = properties.get(PROP_AREA_SQM).and_then(|v| v.as_f64());
        let zone_id = properties.get(PROP_ID).and_then(value_to_id);
        Self {
            category,
            susceptibility,
            area_sqm,
            zone_id,
            geometry,
            properties,
            feature_id: None,
            foreign_members: Map::new(),
        }
    }

    /// Parses a single GeoJSON Feature, e.g. one handed back by a map click.
    pub fn from_geojson_value(value: Value) -> Result<Self, DatasetError> {
        parse_feature(value).map_err(|reason| DatasetError::InvalidFeature { index: 0, reason })
    }

    /// Area used for aggregation; absent areas count as zero.
    pub fn area_or_zero(&self) -> f64 {
        self.area_sqm.unwrap_or(0.0)
    }

    pub fn to_geojson_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::String("Feature".to_string()));
        if let Some(id) = &self.feature_id {
            obj.insert("id".to_string(), id.clone());
        }
        obj.insert(
            "properties".to_string(),
            Value::Object(self.properties.clone()),
        );
        obj.insert(
            "geometry".to_string(),
            geometry_to_geojson_value(&self.geometry),
        );
        for (k, v) in &self.foreign_members {
            obj.entry(k.clone()).or_insert_with(|| v.clone());
        }
        Value::Object(obj)
    }
}

/// The loaded risk-zone FeatureCollection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskDataset {
    pub features: Vec<RiskFeature>,
    /// Top-level members other than `type` and `features` (`name`, `crs`, ...).
    pub foreign_members: Map<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected GeoJSON FeatureCollection")]
    NotAFeatureCollection,
    #[error("invalid feature at index {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },
}

impl RiskDataset {
    pub fn from_features(features: Vec<RiskFeature>) -> Self {
        Self {
            features,
            foreign_members: Map::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounds())
            .reduce(GeoBounds::union)
    }

    pub fn from_geojson_str(payload: &str) -> Result<Self, DatasetError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_geojson_value(value)
    }

    pub fn from_geojson_value(value: Value) -> Result<Self, DatasetError> {
        let Value::Object(mut obj) = value else {
            return Err(DatasetError::NotAFeatureCollection);
        };
        if obj.get("type").and_then(|v| v.as_str()) != Some("FeatureCollection") {
            return Err(DatasetError::NotAFeatureCollection);
        }
        let Some(Value::Array(features_val)) = obj.remove("features") else {
            return Err(DatasetError::NotAFeatureCollection);
        };
        obj.remove("type");

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.into_iter().enumerate() {
            let feature = parse_feature(feat_val)
                .map_err(|reason| DatasetError::InvalidFeature { index, reason })?;
            features.push(feature);
        }

        Ok(Self {
            features,
            foreign_members: obj,
        })
    }

    pub fn to_geojson_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(
            "type".to_string(),
            Value::String("FeatureCollection".to_string()),
        );
        for (k, v) in &self.foreign_members {
            root.insert(k.clone(), v.clone());
        }
        let features = self.features.iter().map(RiskFeature::to_geojson_value).collect();
        root.insert("features".to_string(), Value::Array(features));
        Value::Object(root)
    }

    pub fn to_geojson_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_geojson_value())
    }

    /// Two-space indented output, as written by the data export.
    pub fn to_geojson_string_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_geojson_value())
    }
}

fn value_to_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_feature(value: Value) -> Result<RiskFeature, String> {
    let Value::Object(mut obj) = value else {
        return Err("feature must be an object".to_string());
    };
    match obj.remove("type") {
        Some(Value::String(t)) if t == "Feature" => {}
        Some(Value::String(t)) => return Err(format!("unexpected feature type: {t}")),
        _ => return Err("feature missing type".to_string()),
    }

    let properties = match obj.remove("properties") {
        Some(Value::Object(p)) => p,
        Some(Value::Null) | None => Map::new(),
        Some(_) => return Err("properties must be an object".to_string()),
    };
    let geometry_val = obj
        .remove("geometry")
        .ok_or("feature missing geometry".to_string())?;
    let geometry = parse_geometry(&geometry_val)?;
    let feature_id = obj.remove("id");

    let mut feature = RiskFeature::new(properties, geometry);
    if feature.zone_id.is_none() {
        feature.zone_id = feature_id.as_ref().and_then(value_to_id);
    }
    feature.feature_id = feature_id;
    feature.foreign_members = obj;
    Ok(feature)
}

fn parse_geometry(value: &Value) -> Result<RiskGeometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or("geometry missing type".to_string())?;
    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Polygon" => Ok(RiskGeometry::Polygon(parse_polygon(coords)?)),
        "MultiPolygon" => Ok(RiskGeometry::MultiPolygon(parse_multi_polygon(coords)?)),
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_position(coords: &Value) -> Result<LatLng, String> {
    let arr = coords
        .as_array()
        .ok_or("position must be an array".to_string())?;
    if arr.len() < 2 {
        return Err("position must have [lon, lat]".to_string());
    }
    let lon = arr[0].as_f64().ok_or("lon must be a number".to_string())?;
    let lat = arr[1].as_f64().ok_or("lat must be a number".to_string())?;
    Ok(LatLng::new(lat, lon))
}

fn parse_ring(coords: &Value) -> Result<Ring, String> {
    let arr = coords
        .as_array()
        .ok_or("ring must be an array".to_string())?;
    arr.iter().map(parse_position).collect()
}

fn parse_polygon(coords: &Value) -> Result<Vec<Ring>, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    rings.iter().map(parse_ring).collect()
}

fn parse_multi_polygon(coords: &Value) -> Result<Vec<Vec<Ring>>, String> {
    let polys = coords
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    polys.iter().map(parse_polygon).collect()
}

fn ring_coords(ring: &Ring) -> Value {
    Value::Array(
        ring.iter()
            .map(|p| Value::Array(vec![Value::from(p.lng), Value::from(p.lat)]))
            .collect(),
    )
}

fn polygon_coords(rings: &[Ring]) -> Value {
    Value::Array(rings.iter().map(ring_coords).collect())
}

fn geometry_to_geojson_value(geom: &RiskGeometry) -> Value {
    let mut obj = Map::new();
    match geom {
        RiskGeometry::Polygon(rings) => {
            obj.insert("type".to_string(), Value::String("Polygon".to_string()));
            obj.insert("coordinates".to_string(), polygon_coords(rings));
        }
        RiskGeometry::MultiPolygon(polys) => {
            obj.insert(
                "type".to_string(),
                Value::String("MultiPolygon".to_string()),
            );
            let coords = polys.iter().map(|p| polygon_coords(p)).collect();
            obj.insert("coordinates".to_string(), Value::Array(coords));
        }
    }
    Value::Object(obj)
}
