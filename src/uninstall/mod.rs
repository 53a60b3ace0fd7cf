//! Removing installed packages from the installation root.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::error::PackageError;
use crate::name::PackageName;
use crate::package::{InstalledPackage, PackageRepository};
use crate::runtime::Runtime;

/// Removes installed packages. The first failing entry aborts the removal.
pub struct Uninstaller<'a, R: Runtime> {
    runtime: &'a R,
    install_root: PathBuf,
}

impl<'a, R: Runtime> Uninstaller<'a, R> {
    pub fn new(runtime: &'a R, install_root: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            install_root: install_root.into(),
        }
    }

    /// Removes the package called `name` (any case, suffix optional).
    #[tracing::instrument(skip(self))]
    pub fn uninstall(&self, name: &str) -> Result<InstalledPackage> {
        let name = PackageName::from_installed_name(name)?;

        let repo = PackageRepository::new(self.runtime, &self.install_root);
        let package = repo
            .find(&name)
            .map_err(|e| PackageError::filesystem(&e))?
            .ok_or_else(|| PackageError::NotInstalled {
                name: name.to_string(),
            })?;

        info!("Removing {:?}", package.path);
        remove_tree(self.runtime, &package.path).map_err(|e| PackageError::filesystem(&e))?;

        Ok(package)
    }
}

/// Depth-first removal: files go before the directory holding them.
///
/// Symlinks are unlinked, never followed, so nothing outside `path` is
/// touched. Stops at the first error.
pub fn remove_tree<R: Runtime>(runtime: &R, path: &Path) -> Result<()> {
    if runtime.is_symlink(path) {
        debug!("Unlinking symlink {:?}", path);
        return runtime
            .remove_symlink(path)
            .with_context(|| format!("Failed to remove symlink {:?}", path));
    }

    if !runtime.is_dir(path) {
        return runtime
            .remove_file(path)
            .with_context(|| format!("Failed to remove {:?}", path));
    }

    for entry in runtime.read_dir(path)? {
        remove_tree(runtime, &entry)?;
    }

    runtime
        .remove_dir(path)
        .with_context(|| format!("Failed to remove directory {:?}", path))
}
