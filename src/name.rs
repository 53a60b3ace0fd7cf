use std::fmt;
use std::str::FromStr;

use crate::error::PackageError;

/// Directory suffix every installed package carries.
pub const BUNDLE_SUFFIX: &str = ".bbpackage";

const MAX_NAME_LEN: usize = 214;

/// Longest file name most filesystems accept, in bytes.
const MAX_DIR_NAME_LEN: usize = 255;

/// A lowercased package name (without the `.bbpackage` suffix).
///
/// Names parsed with [`FromStr`] follow the registry rules. Names of bundles
/// already on disk, or taken from an archive, only need to be a single safe
/// path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageName(String);

impl PackageName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory name of this package inside the installation root.
    pub fn bundle_dir_name(&self) -> String {
        format!("{}{}", self.0, BUNDLE_SUFFIX)
    }

    /// Builds a name from a bundle directory's base name
    /// (`Markdown Tools.bbpackage` -> `markdown tools`).
    pub fn from_bundle_dir_name(dir_name: &str) -> Result<Self, PackageError> {
        strip_bundle_suffix(dir_name)
            .filter(|stem| is_safe_dir_stem(stem))
            .map(|stem| PackageName(stem.to_lowercase()))
            .ok_or_else(|| PackageError::InvalidName {
                name: dir_name.to_string(),
            })
    }

    /// Parses a user-supplied name of an installed package. Accepts anything
    /// [`from_bundle_dir_name`](Self::from_bundle_dir_name) accepts, with the
    /// suffix optional.
    pub fn from_installed_name(s: &str) -> Result<Self, PackageError> {
        let trimmed = s.trim();
        let stem = strip_bundle_suffix(trimmed).unwrap_or(trimmed);
        if !is_safe_dir_stem(stem) {
            return Err(PackageError::InvalidName {
                name: s.to_string(),
            });
        }
        Ok(PackageName(stem.to_lowercase()))
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PackageName {
    type Err = PackageError;

    /// Accepts `jshint`, `JSHint` or `jshint.bbpackage`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let stem = strip_bundle_suffix(trimmed).unwrap_or(trimmed);

        if !is_well_formed(stem) {
            return Err(PackageError::InvalidName {
                name: s.to_string(),
            });
        }

        Ok(PackageName(stem.to_lowercase()))
    }
}

fn strip_bundle_suffix(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(BUNDLE_SUFFIX.len())?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (stem, suffix) = name.split_at(split);
    suffix.eq_ignore_ascii_case(BUNDLE_SUFFIX).then_some(stem)
}

fn is_well_formed(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }
    if name.starts_with('.') || name.starts_with('-') {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// A stem that stays a single entry of the installation root once the
/// suffix is added back.
fn is_safe_dir_stem(stem: &str) -> bool {
    !stem.is_empty()
        && stem.len() + BUNDLE_SUFFIX.len() <= MAX_DIR_NAME_LEN
        && !stem.starts_with('.')
        && !stem.contains(['/', '\\', '\0'])
}

/// Case-insensitive check that a directory name belongs to `name`.
pub fn is_bundle_dir_of(dir_name: &str, name: &PackageName) -> bool {
    strip_bundle_suffix(dir_name).is_some_and(|stem| stem.to_lowercase() == name.as_str())
}
