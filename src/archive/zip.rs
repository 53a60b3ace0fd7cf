use crate::error::PackageError;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Component, Path};
use zip::ZipArchive;

/// Top-level folder macOS adds to zips for resource forks.
const MACOS_METADATA_DIR: &str = "__MACOSX";

/// Extractor for .zip archives
pub struct ZipExtractor;

impl ZipExtractor {
    /// Unpacks every entry of `archive_path` under `extract_to`.
    ///
    /// Entries whose path would escape `extract_to` and macOS resource-fork
    /// entries are skipped.
    #[tracing::instrument(skip(self, runtime))]
    pub fn extract<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        self.extract_impl(runtime, archive_path, extract_to)
            .map_err(|e| match e.downcast::<PackageError>() {
                Ok(domain) => domain.into(),
                Err(e) => PackageError::extract(format!("{:#}", e)).into(),
            })
    }

    fn extract_impl<R: Runtime>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
    ) -> Result<()> {
        debug!("Extracting zip archive to {:?}...", extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        let mut archive = ZipArchive::new(file).context("Failed to parse ZIP archive")?;

        runtime
            .create_dir_all(extract_to)
            .map_err(|e| PackageError::filesystem(&e))?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .with_context(|| format!("Failed to read ZIP entry {}", i))?;

            let entry_path = match entry.enclosed_name() {
                Some(path) => path.to_path_buf(),
                None => {
                    debug!("Skipping entry with unsafe path {:?}", entry.name());
                    continue;
                }
            };

            if is_macos_metadata(&entry_path) {
                debug!("Skipping macOS metadata entry {:?}", entry_path);
                continue;
            }

            let full_path = extract_to.join(&entry_path);

            if entry.is_dir() {
                runtime
                    .create_dir_all(&full_path)
                    .map_err(|e| PackageError::filesystem(&e))?;
            } else {
                if let Some(parent) = full_path.parent() {
                    runtime
                        .create_dir_all(parent)
                        .map_err(|e| PackageError::filesystem(&e))?;
                }
                let mut dest_file = runtime
                    .create_file(&full_path)
                    .map_err(|e| PackageError::filesystem(&e))?;
                std::io::copy(&mut entry, &mut dest_file)
                    .with_context(|| format!("Failed to extract file {:?}", full_path))?;

                #[cfg(unix)]
                if let Some(mode) = entry.unix_mode()
                    && let Err(e) = runtime.set_permissions(&full_path, mode)
                {
                    debug!("Failed to set permissions on {:?}: {}", full_path, e);
                }
            }
        }

        info!("Extraction complete.");
        Ok(())
    }
}

fn is_macos_metadata(path: &Path) -> bool {
    matches!(
        path.components().next(),
        Some(Component::Normal(first)) if first == MACOS_METADATA_DIR
    )
}
