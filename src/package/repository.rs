//! Lookup of packages installed under the installation root.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::name::{PackageName, is_bundle_dir_of};
use crate::runtime::Runtime;

use super::InstalledPackage;

/// Read-only view over `<install_root>/*.bbpackage`.
pub struct PackageRepository<'a, R: Runtime> {
    runtime: &'a R,
    install_root: PathBuf,
}

impl<'a, R: Runtime> PackageRepository<'a, R> {
    pub fn new(runtime: &'a R, install_root: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            install_root: install_root.into(),
        }
    }

    /// Finds the installed package called `name`, comparing case-insensitively.
    #[tracing::instrument(skip(self))]
    pub fn find(&self, name: &PackageName) -> Result<Option<InstalledPackage>> {
        if !self.runtime.is_dir(&self.install_root) {
            return Ok(None);
        }

        // Exact match first, avoids a directory scan in the common case
        let exact = self.install_root.join(name.bundle_dir_name());
        if self.is_package_entry(&exact) {
            return Ok(Some(InstalledPackage {
                name: name.to_string(),
                path: exact,
            }));
        }

        for entry in self.entries()? {
            let matches = entry
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| is_bundle_dir_of(n, name));
            if matches && self.is_package_entry(&entry) {
                debug!("Found {} at {:?}", name, entry);
                return Ok(Some(InstalledPackage {
                    name: name.to_string(),
                    path: entry,
                }));
            }
        }

        Ok(None)
    }

    /// All installed packages, sorted by name.
    #[tracing::instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<InstalledPackage>> {
        if !self.runtime.is_dir(&self.install_root) {
            return Ok(Vec::new());
        }

        let mut packages: Vec<InstalledPackage> = self
            .entries()?
            .into_iter()
            .filter(|p| self.runtime.is_dir(p))
            .filter_map(|path| {
                let dir_name = path.file_name()?.to_str()?;
                let name = PackageName::from_bundle_dir_name(dir_name).ok()?;
                Some(InstalledPackage {
                    name: name.to_string(),
                    path,
                })
            })
            .collect();

        packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(packages)
    }

    /// Installed packages are directories, or symlinks to them. Stray files
    /// with a bundle name are not packages.
    fn is_package_entry(&self, path: &Path) -> bool {
        self.runtime.is_dir(path) || self.runtime.is_symlink(path)
    }

    fn entries(&self) -> Result<Vec<PathBuf>> {
        self.runtime
            .read_dir(&self.install_root)
            .with_context(|| format!("Failed to read installation root {:?}", self.install_root))
    }
}
