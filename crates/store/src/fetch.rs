use std::collections::BTreeMap;

use formats::{DatasetError, RiskDataset, sample_dataset};
use futures_util::future::{self, LocalBoxFuture};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Retrieves the raw dataset payload from a location (URL or path).
pub trait DatasetFetcher {
    fn fetch<'a>(&'a self, location: &'a str) -> LocalBoxFuture<'a, Result<String, FetchError>>;
}

/// Serves payloads from memory; unknown locations answer 404.
#[derive(Debug, Default)]
pub struct InMemoryFetcher {
    payloads: BTreeMap<String, String>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, payload: impl Into<String>) {
        self.payloads.insert(location.into(), payload.into());
    }
}

impl DatasetFetcher for InMemoryFetcher {
    fn fetch<'a>(&'a self, location: &'a str) -> LocalBoxFuture<'a, Result<String, FetchError>> {
        let res = self
            .payloads
            .get(location)
            .cloned()
            .ok_or(FetchError::Status(404));
        Box::pin(future::ready(res))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("invalid dataset: {0}")]
    Parse(#[from] DatasetError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetOrigin {
    Fetched { location: String },
    /// The bundled sample replaced a dataset that could not be loaded.
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset {
    pub dataset: RiskDataset,
    pub origin: DatasetOrigin,
}

impl LoadedDataset {
    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, DatasetOrigin::Fallback { .. })
    }
}

/// Fetches and parses the dataset without any fallback.
pub async fn try_load(
    fetcher: &dyn DatasetFetcher,
    location: &str,
) -> Result<RiskDataset, LoadError> {
    let payload = fetcher.fetch(location).await?;
    Ok(RiskDataset::from_geojson_str(&payload)?)
}

/// Loads the dataset at `location`, substituting the sample dataset when it
/// cannot be fetched or parsed. Never fails.
pub async fn load(fetcher: &dyn DatasetFetcher, location: &str) -> LoadedDataset {
    match try_load(fetcher, location).await {
        Ok(dataset) => {
            info!(location, features = dataset.len(), "dataset loaded");
            LoadedDataset {
                dataset,
                origin: DatasetOrigin::Fetched {
                    location: location.to_string(),
                },
            }
        }
        Err(err) => {
            warn!(location, error = %err, "dataset unavailable, using sample data");
            LoadedDataset {
                dataset: sample_dataset(),
                origin: DatasetOrigin::Fallback {
                    reason: err.to_string(),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use formats::sample_dataset;
    use pretty_assertions::assert_eq;

    use super::{DatasetOrigin, InMemoryFetcher, LoadError, load, try_load};

    const ONE_ZONE: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"risk_level":"Extreme","area_sqm":5.0},
         "geometry":{"type":"Polygon","coordinates":[[[120.9,17.1],[120.91,17.1],[120.91,17.09],[120.9,17.1]]]}}]}"#;

    #[test]
    fn fetched_dataset_is_used() {
        let mut fetcher = InMemoryFetcher::new();
        fetcher.insert("data.geojson", ONE_ZONE);
        let loaded = pollster::block_on(load(&fetcher, "data.geojson"));
        assert_eq!(loaded.dataset.len(), 1);
        assert_eq!(
            loaded.origin,
            DatasetOrigin::Fetched {
                location: "data.geojson".to_string()
            }
        );
    }

    #[test]
    fn missing_dataset_falls_back_to_sample() {
        let fetcher = InMemoryFetcher::new();
        let loaded = pollster::block_on(load(&fetcher, "missing.geojson"));
        assert!(loaded.is_fallback());
        assert_eq!(loaded.dataset, sample_dataset());
    }

    #[test]
    fn malformed_payload_falls_back_to_sample() {
        let mut fetcher = InMemoryFetcher::new();
        fetcher.insert("bad.geojson", "{not json");
        let loaded = pollster::block_on(load(&fetcher, "bad.geojson"));
        assert!(loaded.is_fallback());
        assert_eq!(loaded.dataset.len(), 3);
    }

    #[test]
    fn try_load_reports_status() {
        let fetcher = InMemoryFetcher::new();
        let err = pollster::block_on(try_load(&fetcher, "nope")).unwrap_err();
        assert!(matches!(err, LoadError::Fetch(_)));
        assert_eq!(err.to_string(), "unexpected HTTP status 404");
    }
}
