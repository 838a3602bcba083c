//! File exports of the current view and dataset.
//!
//! Every export yields an [`ExportFile`]; the host performs the download.

pub mod data;
pub mod document;
pub mod report;
pub mod snapshot;

use std::fmt;

use chrono::{NaiveDate, Utc};
use runtime::NoticeLevel;

pub use data::*;
pub use document::*;
pub use report::*;
pub use snapshot::*;

pub const MIME_PNG: &str = "image/png";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_GEOJSON: &str = "application/json";
pub const MIME_TEXT: &str = "text/plain";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Host-provided piece an export depends on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Collaborator {
    Rasterizer,
    DocumentBuilder,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::Rasterizer => f.write_str("image capture"),
            Collaborator::DocumentBuilder => f.write_str("PDF builder"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("{0} is not available")]
    MissingCollaborator(Collaborator),
    #[error("error capturing map image: {0}")]
    Capture(String),
    #[error("error creating PDF: {0}")]
    DocumentBuild(String),
    #[error("no data available for export, load the map data first")]
    NoDataLoaded,
    #[error("cannot serialize dataset: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ExportError {
    pub fn notice_level(&self) -> NoticeLevel {
        match self {
            ExportError::NoDataLoaded => NoticeLevel::Notice,
            _ => NoticeLevel::Blocking,
        }
    }
}

/// `<prefix>_<YYYY-MM-DD>.<ext>`
pub fn stamped_file_name(prefix: &str, date: NaiveDate, extension: &str) -> String {
    format!("{prefix}_{}.{extension}", date.format("%Y-%m-%d"))
}

/// Date used to stamp exports.
pub fn export_date() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use runtime::NoticeLevel;

    use super::{Collaborator, ExportError, stamped_file_name};

    #[test]
    fn file_names_carry_iso_date() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            stamped_file_name("bontoc_landslide_map", d, "png"),
            "bontoc_landslide_map_2024-03-07.png"
        );
    }

    #[test]
    fn only_missing_data_is_non_blocking() {
        assert_eq!(ExportError::NoDataLoaded.notice_level(), NoticeLevel::Notice);
        assert_eq!(
            ExportError::MissingCollaborator(Collaborator::Rasterizer).notice_level(),
            NoticeLevel::Blocking
        );
    }
}
