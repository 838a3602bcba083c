use chrono::NaiveDate;
use store::FeatureStore;
use tracing::info;

use super::{ExportError, ExportFile, MIME_GEOJSON, stamped_file_name};

/// The loaded dataset as indented GeoJSON.
pub fn export_data(
    store: &FeatureStore,
    prefix: &str,
    date: NaiveDate,
) -> Result<ExportFile, ExportError> {
    let dataset = store.dataset().ok_or(ExportError::NoDataLoaded)?;
    let json = dataset.to_geojson_string_pretty()?;
    let file_name = stamped_file_name(prefix, date, "geojson");
    info!(%file_name, features = dataset.len(), "data exported");
    Ok(ExportFile {
        file_name,
        mime: MIME_GEOJSON,
        bytes: json.into_bytes(),
    })
}
