//! Dataset access for the command line: HTTP(S) URLs or local paths.

use std::path::{Path, PathBuf};

use futures_util::future::LocalBoxFuture;
use reqwest::Client;
use store::{DatasetFetcher, FetchError};
use tracing::debug;
use viewer::export::ExportFile;

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

#[derive(Debug, Clone, Default)]
pub struct DatasetSource {
    client: Client,
}

impl DatasetSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_http(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        resp.text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }

    async fn read_file(&self, path: &str) -> Result<String, FetchError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FetchError::Io {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }
}

impl DatasetFetcher for DatasetSource {
    fn fetch<'a>(&'a self, location: &'a str) -> LocalBoxFuture<'a, Result<String, FetchError>> {
        Box::pin(async move {
            debug!(location, remote = is_remote(location), "fetching dataset");
            if is_remote(location) {
                self.fetch_http(location).await
            } else {
                self.read_file(location).await
            }
        })
    }
}

/// Writes an export into `dir` under its own file name.
pub async fn write_export(dir: &Path, file: &ExportFile) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&file.file_name);
    tokio::fs::write(&path, &file.bytes).await?;
    Ok(path)
}
