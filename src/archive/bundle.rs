use crate::error::PackageError;
use crate::name::BUNDLE_SUFFIX;
use crate::runtime::Runtime;
use anyhow::Result;
use glob::{MatchOptions, Pattern};
use log::debug;
use std::path::{Path, PathBuf};

/// Finds the only `*.bbpackage` directory anywhere below `root`.
///
/// Symlinks are never followed. Zero or several matches fail with
/// [`PackageError::AmbiguousBundle`].
#[tracing::instrument(skip(runtime))]
pub fn find_bundle<R: Runtime>(runtime: &R, root: &Path) -> Result<PathBuf> {
    let pattern = Pattern::new(&format!("*{}", BUNDLE_SUFFIX))?;
    let mut found = Vec::new();
    collect_bundles(runtime, root, &pattern, &mut found)?;

    debug!("Bundle candidates under {:?}: {:?}", root, found);

    if found.len() == 1 {
        Ok(found.remove(0))
    } else {
        Err(PackageError::AmbiguousBundle { found: found.len() }.into())
    }
}

fn collect_bundles<R: Runtime>(
    runtime: &R,
    dir: &Path,
    pattern: &Pattern,
    found: &mut Vec<PathBuf>,
) -> Result<()> {
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    for entry in runtime
        .read_dir(dir)
        .map_err(|e| PackageError::filesystem(&e))?
    {
        if runtime.is_symlink(&entry) || !runtime.is_dir(&entry) {
            continue;
        }

        let is_bundle = entry
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| pattern.matches_with(n, options));
        if is_bundle {
            found.push(entry.clone());
        }

        // Keep descending: a bundle nested in a bundle still counts
        collect_bundles(runtime, &entry, pattern, found)?;
    }
    Ok(())
}
