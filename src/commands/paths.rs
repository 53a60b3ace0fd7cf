use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Directory, under the user support dir, that holds installed packages.
pub const PACKAGES_DIR_NAME: &str = "Packages";

/// Get the default installation root: `<user support dir>/Packages`.
#[tracing::instrument(skip(runtime))]
pub fn default_install_root<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let root = user_support_dir(runtime)?.join(PACKAGES_DIR_NAME);
    debug!("Default install root: {:?}", root);
    Ok(root)
}

/// `~/Library/Application Support/BBEdit` for the current user.
#[cfg(target_os = "macos")]
fn user_support_dir<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home = runtime
        .user_home_dir()
        .context("Could not determine the current user's home directory")?;
    Ok(home
        .join("Library")
        .join("Application Support")
        .join("BBEdit"))
}

/// `<data dir>/BBEdit`, falling back to `~/.local/share/BBEdit`.
#[cfg(not(target_os = "macos"))]
fn user_support_dir<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let data_dir = runtime
        .data_dir()
        .or_else(|| runtime.user_home_dir().map(|home| home.join(".local").join("share")))
        .context("Could not determine the current user's data directory")?;
    Ok(data_dir.join("BBEdit"))
}
