mod repository;

use std::path::PathBuf;

pub use repository::PackageRepository;

/// A package present in the installation root.
///
/// The directory on disk is the only record of an installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    /// Lowercased package name without the `.bbpackage` suffix.
    pub name: String,
    pub path: PathBuf,
}

impl InstalledPackage {
    /// Directory name as it exists on disk (original case kept).
    pub fn dir_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
