//! Archive resolution: unpack a downloaded zip and find the one package
//! bundle (`*.bbpackage` directory) inside it.

mod bundle;
mod zip;

use crate::runtime::Runtime;
use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};

pub use bundle::find_bundle;
pub use zip::ZipExtractor;

/// Subdirectory of the working directory that receives the archive contents.
pub const EXTRACT_DIR_NAME: &str = "extracted";

/// Extracts `archive_path` under `work_dir` and returns the path of the
/// single bundle directory it contains.
#[tracing::instrument(skip(runtime))]
pub fn resolve_bundle<R: Runtime>(
    runtime: &R,
    archive_path: &Path,
    work_dir: &Path,
) -> Result<PathBuf> {
    let extract_to = work_dir.join(EXTRACT_DIR_NAME);
    ZipExtractor.extract(runtime, archive_path, &extract_to)?;

    let bundle = find_bundle(runtime, &extract_to)?;
    info!("Found package bundle at {:?}", bundle);
    Ok(bundle)
}
