use crate::error::PackageError;
use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

/// File name the downloaded archive gets inside its working directory.
pub const ARCHIVE_FILE_NAME: &str = "package.zip";

/// Fetches package archives over HTTP(S) into a local working directory.
#[derive(Clone)]
pub struct Transport {
    http_client: HttpClient,
    max_redirects: usize,
}

impl Transport {
    /// `http_client` must not follow redirects on its own.
    pub fn new(http_client: HttpClient, max_redirects: usize) -> Self {
        Self {
            http_client,
            max_redirects,
        }
    }

    pub fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Downloads `url` into `dest_dir` and returns the archive's path.
    #[tracing::instrument(skip(self, runtime, dest_dir))]
    pub async fn fetch<R: Runtime>(&self, runtime: &R, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        info!("Downloading file from {}...", url);

        let archive_path = dest_dir.join(ARCHIVE_FILE_NAME);
        let bytes = self
            .http_client
            .download_file(url, self.max_redirects, || {
                runtime
                    .create_file(&archive_path)
                    .with_context(|| format!("Failed to create temporary file at {:?}", archive_path))
                    .map_err(|e| PackageError::filesystem(&e).into())
            })
            .await?;

        info!("Download complete ({} bytes).", bytes);
        Ok(archive_path)
    }
}
