use foundation::LatLng;
use serde_json::{Map, Value, json};

use crate::risk_dataset::{RiskDataset, RiskFeature, RiskGeometry};

/// Built-in dataset used when the real one cannot be fetched.
///
/// Three 0.01° square zones east of Bontoc: High, Moderate and Low.
pub fn sample_dataset() -> RiskDataset {
    let mut ds = RiskDataset::from_features(vec![
        square_zone("zone_001", "High", 0.82, 23000.0, 120.92, 17.11),
        square_zone("zone_002", "Moderate", 0.58, 18000.0, 120.93, 17.10),
        square_zone("zone_003", "Low", 0.25, 35000.0, 120.94, 17.10),
    ]);
    ds.foreign_members
        .insert("name".to_string(), Value::String("sample".to_string()));
    ds
}

fn square_zone(
    id: &str,
    risk_level: &str,
    susceptibility: f64,
    area_sqm: f64,
    west: f64,
    north: f64,
) -> RiskFeature {
    const SIDE: f64 = 0.01;
    let ring = vec![
        LatLng::new(north, west),
        LatLng::new(north, west + SIDE),
        LatLng::new(north - SIDE, west + SIDE),
        LatLng::new(north - SIDE, west),
        LatLng::new(north, west),
    ];

    let mut properties = Map::new();
    properties.insert("risk_level".to_string(), json!(risk_level));
    properties.insert("susceptibility_avg".to_string(), json!(susceptibility));
    properties.insert("area_sqm".to_string(), json!(area_sqm));
    properties.insert("id".to_string(), json!(id));

    RiskFeature::new(properties, RiskGeometry::Polygon(vec![ring]))
}
