//! Placing a resolved bundle into the installation root.

mod pipeline;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{PackageError, has_io_kind};
use crate::name::PackageName;
use crate::package::{InstalledPackage, PackageRepository};
use crate::runtime::Runtime;

pub use pipeline::{DownloadArtifact, InstallPipeline, Stage};

/// Location of the dependency manifest inside a bundle.
pub const DEPENDENCY_MANIFEST: &str = "Contents/package.json";

/// Prefix of the hidden staging directories created inside the root.
const STAGING_PREFIX: &str = ".staging-";

/// External command run next to a bundle's dependency manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyStep {
    pub program: String,
    pub args: Vec<String>,
}

impl DependencyStep {
    pub fn npm(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["install".to_string()],
        }
    }
}

/// What happened in the post-install dependency step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyOutcome {
    /// The bundle has no dependency manifest.
    NotNeeded,
    /// A manifest exists but the step is disabled.
    Skipped,
    Installed,
    /// Best effort: the package stays installed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub package: InstalledPackage,
    pub dependencies: DependencyOutcome,
}

/// Moves bundles into the installation root without ever replacing an
/// existing installation.
pub struct Installer<'a, R: Runtime> {
    runtime: &'a R,
    install_root: PathBuf,
    dependency_step: Option<DependencyStep>,
}

impl<'a, R: Runtime> Installer<'a, R> {
    pub fn new(
        runtime: &'a R,
        install_root: impl Into<PathBuf>,
        dependency_step: Option<DependencyStep>,
    ) -> Self {
        Self {
            runtime,
            install_root: install_root.into(),
            dependency_step,
        }
    }

    /// Moves `bundle_dir` to `<install_root>/<its base name>` and runs the
    /// dependency step when the bundle ships a manifest.
    #[tracing::instrument(skip(self))]
    pub async fn install(&self, bundle_dir: &Path) -> Result<InstallReport> {
        let dir_name = bundle_dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PackageError::InvalidName {
                name: bundle_dir.display().to_string(),
            })?
            .to_string();
        let name = PackageName::from_bundle_dir_name(&dir_name)?;

        self.runtime
            .create_dir_all(&self.install_root)
            .with_context(|| format!("Failed to create installation root {:?}", self.install_root))
            .map_err(|e| PackageError::filesystem(&e))?;

        let repo = PackageRepository::new(self.runtime, &self.install_root);
        if let Some(existing) = repo.find(&name).map_err(|e| PackageError::filesystem(&e))? {
            debug!("{} already present at {:?}", name, existing.path);
            return Err(PackageError::AlreadyInstalled {
                name: existing.dir_name(),
            }
            .into());
        }

        let target = self.install_root.join(&dir_name);
        info!("Installing {:?} to {:?}", bundle_dir, target);
        self.move_into_place(bundle_dir, &target, &dir_name)?;

        let package = InstalledPackage {
            name: name.to_string(),
            path: target,
        };
        let dependencies = self.install_dependencies(&package.path).await;

        Ok(InstallReport {
            package,
            dependencies,
        })
    }

    fn move_into_place(&self, bundle_dir: &Path, target: &Path, dir_name: &str) -> Result<()> {
        match self.runtime.rename_noreplace(bundle_dir, target) {
            Ok(()) => Ok(()),
            Err(e) if has_io_kind(&e, ErrorKind::CrossesDevices) => {
                debug!("{:?} is on another filesystem, staging a copy", bundle_dir);
                self.move_across_devices(bundle_dir, target, dir_name)
            }
            Err(e) => Err(move_error(e, dir_name)),
        }
    }

    /// Copies into a hidden staging directory on the target filesystem, then
    /// renames into place. The staging directory is removed on every path.
    fn move_across_devices(&self, bundle_dir: &Path, target: &Path, dir_name: &str) -> Result<()> {
        let staging = self
            .runtime
            .temp_dir_in(&self.install_root, STAGING_PREFIX)
            .context("Failed to create staging directory")
            .map_err(|e| PackageError::filesystem(&e))?;

        let staged = staging.path().join(dir_name);
        copy_tree(self.runtime, bundle_dir, &staged).map_err(|e| PackageError::filesystem(&e))?;

        self.runtime
            .rename_noreplace(&staged, target)
            .map_err(|e| move_error(e, dir_name))
    }

    async fn install_dependencies(&self, package_dir: &Path) -> DependencyOutcome {
        let manifest = package_dir.join(DEPENDENCY_MANIFEST);
        if !self.runtime.exists(&manifest) {
            return DependencyOutcome::NotNeeded;
        }

        let Some(step) = &self.dependency_step else {
            info!("Skipping dependency installation for {:?}", package_dir);
            return DependencyOutcome::Skipped;
        };

        // The manifest always sits in a directory; fall back to the package dir anyway
        let cwd = manifest.parent().unwrap_or(package_dir);
        info!("Installing dependencies with {} in {:?}", step.program, cwd);

        match self.runtime.run_command(&step.program, &step.args, cwd).await {
            Ok(true) => DependencyOutcome::Installed,
            Ok(false) => {
                let reason = format!("{} exited with an error", step.program);
                warn!("Dependency installation failed: {}", reason);
                DependencyOutcome::Failed(reason)
            }
            Err(e) => {
                warn!("Dependency installation failed: {:#}", e);
                DependencyOutcome::Failed(format!("{:#}", e))
            }
        }
    }
}

fn move_error(err: anyhow::Error, dir_name: &str) -> anyhow::Error {
    if has_io_kind(&err, ErrorKind::AlreadyExists) || has_io_kind(&err, ErrorKind::DirectoryNotEmpty)
    {
        PackageError::AlreadyInstalled {
            name: dir_name.to_string(),
        }
        .into()
    } else {
        PackageError::filesystem(&err).into()
    }
}

/// Recursive copy through the runtime. Symlinks are skipped.
fn copy_tree<R: Runtime>(runtime: &R, from: &Path, to: &Path) -> Result<()> {
    runtime.create_dir_all(to)?;
    for entry in runtime.read_dir(from)? {
        let Some(file_name) = entry.file_name() else {
            continue;
        };
        let dest = to.join(file_name);
        if runtime.is_symlink(&entry) {
            warn!("Not copying symlink {:?}", entry);
        } else if runtime.is_dir(&entry) {
            copy_tree(runtime, &entry, &dest)?;
        } else {
            runtime
                .copy(&entry, &dest)
                .with_context(|| format!("Failed to copy {:?}", entry))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use crate::archive::resolve_bundle;
    use crate::test_utils::{ZipEntry, create_zip, snapshot_tree, test_root};
    use mockall::predicate::eq;
    use std::fs;
    use tempfile::tempdir;

    fn make_bundle(parent: &Path, dir_name: &str) -> PathBuf {
        let bundle = parent.join(dir_name);
        fs::create_dir_all(bundle.join("Contents/Scripts")).unwrap();
        fs::write(bundle.join("Contents/Info.plist"), "<plist/>").unwrap();
        fs::write(bundle.join("Contents/Scripts/run.sh"), "echo hi").unwrap();
        bundle
    }

    fn is_staged(path: &Path) -> bool {
        path.parent()
            .and_then(|p| p.file_name())
            .is_some_and(|n| n.to_string_lossy().starts_with(STAGING_PREFIX))
    }

    #[tokio::test]
    async fn test_install_moves_bundle() {
        let work = tempdir().unwrap();
        let root = tempdir().unwrap();
        let bundle = make_bundle(work.path(), "jshint.bbpackage");

        let installer = Installer::new(&RealRuntime, root.path(), None);
        let report = installer.install(&bundle).await.unwrap();

        let target = root.path().join("jshint.bbpackage");
        assert_eq!(report.package.name, "jshint");
        assert_eq!(report.package.path, target);
        assert_eq!(report.dependencies, DependencyOutcome::NotNeeded);
        assert!(!bundle.exists());
        assert_eq!(fs::read_to_string(target.join("Contents/Info.plist")).unwrap(), "<plist/>");
    }

    #[tokio::test]
    async fn test_install_creates_missing_root() {
        let work = tempdir().unwrap();
        let root = tempdir().unwrap();
        let nested_root = root.path().join("BBEdit/Packages");
        let bundle = make_bundle(work.path(), "lint.bbpackage");

        let installer = Installer::new(&RealRuntime, &nested_root, None);
        installer.install(&bundle).await.unwrap();

        assert!(nested_root.join("lint.bbpackage").is_dir());
    }

    #[tokio::test]
    async fn test_install_keeps_original_case() {
        let work = tempdir().unwrap();
        let root = tempdir().unwrap();
        let bundle = make_bundle(work.path(), "JSHint.bbpackage");

        let installer = Installer::new(&RealRuntime, root.path(), None);
        let report = installer.install(&bundle).await.unwrap();

        assert_eq!(report.package.name, "jshint");
        assert_eq!(report.package.dir_name(), "JSHint.bbpackage");
    }

    #[tokio::test]
    async fn test_install_already_installed_leaves_existing_untouched() {
        let work = tempdir().unwrap();
        let root = tempdir().unwrap();
        let existing = root.path().join("jshint.bbpackage");
        fs::create_dir_all(existing.join("Contents")).unwrap();
        fs::write(existing.join("Contents/Info.plist"), "old version").unwrap();
        let before = snapshot_tree(root.path());

        let bundle = make_bundle(work.path(), "jshint.bbpackage");
        let installer = Installer::new(&RealRuntime, root.path(), None);
        let err = installer.install(&bundle).await.unwrap_err();

        match err.downcast_ref::<PackageError>() {
            Some(PackageError::AlreadyInstalled { name }) => assert_eq!(name, "jshint.bbpackage"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(snapshot_tree(root.path()), before);
        assert!(bundle.exists());
    }

    #[tokio::test]
    async fn test_install_already_installed_differing_case() {
        let work = tempdir().unwrap();
        let root = tempdir().unwrap();
        fs::create_dir(root.path().join("JSHint.bbpackage")).unwrap();

        let bundle = make_bundle(work.path(), "jshint.bbpackage");
        let installer = Installer::new(&RealRuntime, root.path(), None);
        let err = installer.install(&bundle).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::AlreadyInstalled { .. })
        ));
        assert!(!root.path().join("jshint.bbpackage").exists());
    }

    #[tokio::test]
    async fn test_install_race_on_rename_reports_already_installed() {
        // Target appears between the lookup and the rename
        let mut runtime = MockRuntime::new();
        let root = test_root();
        let bundle = PathBuf::from("/tmp/work/extracted/jshint.bbpackage");
        let target = root.join("jshint.bbpackage");

        runtime.expect_create_dir_all().returning(|_| Ok(()));
        let root_dir = root.clone();
        runtime
            .expect_is_dir()
            .withf(move |p| p == root_dir.as_path())
            .returning(|_| true);
        let root_dir = root.clone();
        runtime
            .expect_is_dir()
            .withf(move |p| p != root_dir.as_path())
            .returning(|_| false);
        runtime.expect_is_symlink().returning(|_| false);
        runtime.expect_read_dir().returning(|_| Ok(vec![]));
        runtime
            .expect_rename_noreplace()
            .with(eq(bundle.clone()), eq(target))
            .times(1)
            .returning(|_, _| {
                Err(anyhow::Error::from(std::io::Error::from(
                    std::io::ErrorKind::AlreadyExists,
                )))
            });

        let installer = Installer::new(&runtime, root, None);
        let err = installer.install(&bundle).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::AlreadyInstalled { .. })
        ));
    }

    #[tokio::test]
    async fn test_install_rename_failure_is_filesystem_error() {
        let mut runtime = MockRuntime::new();
        let root = test_root();

        runtime.expect_create_dir_all().returning(|_| Ok(()));
        let root_dir = root.clone();
        runtime
            .expect_is_dir()
            .withf(move |p| p == root_dir.as_path())
            .returning(|_| true);
        let root_dir = root.clone();
        runtime
            .expect_is_dir()
            .withf(move |p| p != root_dir.as_path())
            .returning(|_| false);
        runtime.expect_is_symlink().returning(|_| false);
        runtime.expect_read_dir().returning(|_| Ok(vec![]));
        runtime.expect_rename_noreplace().returning(|_, _| {
            Err(anyhow::Error::from(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            )))
        });

        let installer = Installer::new(&runtime, root, None);
        let err = installer
            .install(Path::new("/tmp/work/jshint.bbpackage"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::Filesystem { .. })
        ));
    }

    #[tokio::test]
    async fn test_install_cross_device_copies_via_staging() {
        let root = tempdir().unwrap();
        let work = tempdir().unwrap();
        let bundle = make_bundle(work.path(), "jshint.bbpackage");
        let target = root.path().join("jshint.bbpackage");

        // Real filesystem, except the first rename pretends to cross devices
        let mut runtime = MockRuntime::new();
        runtime
            .expect_create_dir_all()
            .returning(|p| RealRuntime.create_dir_all(p));
        runtime.expect_is_dir().returning(|p| RealRuntime.is_dir(p));
        runtime
            .expect_is_symlink()
            .returning(|p| RealRuntime.is_symlink(p));
        runtime.expect_exists().returning(|p| RealRuntime.exists(p));
        runtime
            .expect_read_dir()
            .returning(|p| RealRuntime.read_dir(p));
        runtime
            .expect_copy()
            .returning(|a, b| RealRuntime.copy(a, b));
        runtime
            .expect_rename_noreplace()
            .withf(|from, _| !is_staged(from))
            .times(1)
            .returning(|_, _| {
                Err(anyhow::Error::from(std::io::Error::from(
                    std::io::ErrorKind::CrossesDevices,
                )))
            });
        runtime
            .expect_rename_noreplace()
            .withf(|from, _| is_staged(from))
            .returning(|a, b| RealRuntime.rename_noreplace(a, b));
        runtime
            .expect_temp_dir_in()
            .withf(|_, prefix| prefix == STAGING_PREFIX)
            .times(1)
            .returning(|p, prefix| RealRuntime.temp_dir_in(p, prefix));

        let installer = Installer::new(&runtime, root.path(), None);
        installer.install(&bundle).await.unwrap();

        assert_eq!(
            fs::read_to_string(target.join("Contents/Scripts/run.sh")).unwrap(),
            "echo hi"
        );
        let leftovers: Vec<_> = fs::read_dir(root.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("jshint.bbpackage")]);
    }

    #[tokio::test]
    async fn test_install_bundle_name_with_space() {
        let work = tempdir().unwrap();
        let root = tempdir().unwrap();
        let archive = work.path().join("package.zip");
        create_zip(
            &archive,
            &[
                ZipEntry::Dir("Markdown Tools.bbpackage/"),
                ZipEntry::File("Markdown Tools.bbpackage/Contents/Info.plist", "<plist/>"),
            ],
        )
        .unwrap();
        let bundle = resolve_bundle(&RealRuntime, &archive, work.path()).unwrap();

        let installer = Installer::new(&RealRuntime, root.path(), None);
        let report = installer.install(&bundle).await.unwrap();

        assert_eq!(report.package.name, "markdown tools");
        assert_eq!(report.package.dir_name(), "Markdown Tools.bbpackage");
        assert!(
            root.path()
                .join("Markdown Tools.bbpackage/Contents/Info.plist")
                .is_file()
        );
    }

    #[tokio::test]
    async fn test_install_rejects_bundle_with_bad_name() {
        let runtime = MockRuntime::new();
        let installer = Installer::new(&runtime, test_root(), None);

        let err = installer
            .install(Path::new("/tmp/work/not-a-bundle"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::InvalidName { .. })
        ));
    }

    #[tokio::test]
    async fn test_install_runs_dependency_step() {
        let work = tempdir().unwrap();
        let root = tempdir().unwrap();
        let bundle = make_bundle(work.path(), "withdeps.bbpackage");
        fs::write(bundle.join(DEPENDENCY_MANIFEST), "{}").unwrap();
        let contents = root.path().join("withdeps.bbpackage/Contents");

        let mut runtime = MockRuntime::new();
        runtime
            .expect_create_dir_all()
            .returning(|p| RealRuntime.create_dir_all(p));
        runtime.expect_is_dir().returning(|p| RealRuntime.is_dir(p));
        runtime
            .expect_is_symlink()
            .returning(|p| RealRuntime.is_symlink(p));
        runtime
            .expect_read_dir()
            .returning(|p| RealRuntime.read_dir(p));
        runtime
            .expect_rename_noreplace()
            .returning(|a, b| RealRuntime.rename_noreplace(a, b));
        runtime.expect_exists().returning(|p| RealRuntime.exists(p));
        runtime
            .expect_run_command()
            .withf(move |program, args, cwd| {
                program == "npm" && args.to_vec() == vec!["install".to_string()] && cwd == contents.as_path()
            })
            .times(1)
            .returning(|_, _, _| Ok(true));

        let installer = Installer::new(&runtime, root.path(), Some(DependencyStep::npm("npm")));
        let report = installer.install(&bundle).await.unwrap();

        assert_eq!(report.dependencies, DependencyOutcome::Installed);
    }

    #[tokio::test]
    async fn test_install_dependency_failure_keeps_package() {
        let work = tempdir().unwrap();
        let root = tempdir().unwrap();
        let bundle = make_bundle(work.path(), "withdeps.bbpackage");
        fs::write(bundle.join(DEPENDENCY_MANIFEST), "{}").unwrap();

        let mut runtime = MockRuntime::new();
        runtime
            .expect_create_dir_all()
            .returning(|p| RealRuntime.create_dir_all(p));
        runtime.expect_is_dir().returning(|p| RealRuntime.is_dir(p));
        runtime
            .expect_is_symlink()
            .returning(|p| RealRuntime.is_symlink(p));
        runtime
            .expect_read_dir()
            .returning(|p| RealRuntime.read_dir(p));
        runtime
            .expect_rename_noreplace()
            .returning(|a, b| RealRuntime.rename_noreplace(a, b));
        runtime.expect_exists().returning(|p| RealRuntime.exists(p));
        runtime
            .expect_run_command()
            .returning(|_, _, _| Err(anyhow::anyhow!("npm: command not found")));

        let installer = Installer::new(&runtime, root.path(), Some(DependencyStep::npm("npm")));
        let report = installer.install(&bundle).await.unwrap();

        assert!(matches!(report.dependencies, DependencyOutcome::Failed(_)));
        assert!(root.path().join("withdeps.bbpackage").is_dir());
    }

    #[tokio::test]
    async fn test_install_dependency_step_disabled() {
        let work = tempdir().unwrap();
        let root = tempdir().unwrap();
        let bundle = make_bundle(work.path(), "withdeps.bbpackage");
        fs::write(bundle.join(DEPENDENCY_MANIFEST), "{}").unwrap();

        let installer = Installer::new(&RealRuntime, root.path(), None);
        let report = installer.install(&bundle).await.unwrap();

        assert_eq!(report.dependencies, DependencyOutcome::Skipped);
    }
}
