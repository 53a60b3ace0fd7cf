//! File system operations (read, write, rename, remove, permissions).

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::{ReadSeek, RealRuntime};

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn exists_impl(&self, path: &Path) -> bool {
        path.exists()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_dir_impl(&self, path: &Path) -> bool {
        path.is_dir()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn is_symlink_impl(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn read_dir_impl(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path)
            .with_context(|| format!("Failed to read directory {:?}", path))?
            .map(|entry| Ok(entry?.path()))
            .collect::<Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn create_dir_all_impl(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).context("Failed to create directory")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn create_file_impl(&self, path: &Path) -> Result<Box<dyn io::Write + Send>> {
        let file = fs::File::create(path).context("Failed to create file")?;
        Ok(Box::new(file))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn open_impl(&self, path: &Path) -> Result<Box<dyn ReadSeek>> {
        let file = fs::File::open(path).context("Failed to open file")?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn copy_impl(&self, from: &Path, to: &Path) -> Result<u64> {
        fs::copy(from, to).context("Failed to copy file")
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn rename_noreplace_impl(&self, from: &Path, to: &Path) -> Result<()> {
        #[cfg(all(target_os = "linux", target_env = "gnu"))]
        {
            use nix::errno::Errno;
            use nix::fcntl::{RenameFlags, renameat2};

            match renameat2(None, from, None, to, RenameFlags::RENAME_NOREPLACE) {
                Ok(()) => return Ok(()),
                // Filesystem or kernel without RENAME_NOREPLACE support
                Err(Errno::EINVAL) | Err(Errno::ENOSYS) => {
                    log::debug!("renameat2 unsupported for {:?}, using checked rename", to);
                }
                Err(errno) => {
                    return Err(io::Error::from(errno))
                        .with_context(|| format!("Failed to move {:?} to {:?}", from, to));
                }
            }
        }

        if to.exists() || self.is_symlink_impl(to) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{:?} already exists", to),
            ))
            .with_context(|| format!("Failed to move {:?} to {:?}", from, to));
        }
        fs::rename(from, to).with_context(|| format!("Failed to move {:?} to {:?}", from, to))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_file_impl(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).context("Failed to remove file")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_dir_impl(&self, path: &Path) -> Result<()> {
        fs::remove_dir(path).context("Failed to remove directory")?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn remove_symlink_impl(&self, path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            fs::remove_file(path).context("Failed to remove symlink")?;
        }
        #[cfg(windows)]
        {
            // Directory symlinks need remove_dir on Windows
            fs::remove_dir(path)
                .or_else(|_| fs::remove_file(path))
                .context("Failed to remove symlink")?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn set_permissions_impl(&self, path: &Path, mode: u32) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(mode);
            fs::set_permissions(path, permissions).context("Failed to set permissions")?;
        }
        #[cfg(not(unix))]
        {
            let _ = (path, mode);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn temp_dir_impl(&self, prefix: &str) -> Result<TempDir> {
        tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .context("Failed to create temporary directory")
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn temp_dir_in_impl(&self, parent: &Path, prefix: &str) -> Result<TempDir> {
        tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(parent)
            .with_context(|| format!("Failed to create temporary directory in {:?}", parent))
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{RealRuntime, Runtime};
    use std::io::{Read, Write};
    use tempfile::tempdir;

    #[test]
    fn test_real_runtime_file_ops() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.txt");

        {
            let mut writer = runtime.create_file(&file_path).unwrap();
            writer.write_all(b"hello").unwrap();
        }
        assert!(runtime.exists(&file_path));

        let copy_path = dir.path().join("copy.txt");
        assert_eq!(runtime.copy(&file_path, &copy_path).unwrap(), 5);

        let new_path = dir.path().join("renamed.txt");
        runtime.rename_noreplace(&file_path, &new_path).unwrap();
        assert!(!runtime.exists(&file_path));

        let mut content = String::new();
        runtime
            .open(&new_path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "hello");

        runtime.remove_file(&new_path).unwrap();
        assert!(!runtime.exists(&new_path));
    }

    #[test]
    fn test_real_runtime_dir_ops() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let sub_dir = dir.path().join("sub/nested");

        runtime.create_dir_all(&sub_dir).unwrap();
        assert!(runtime.is_dir(&sub_dir));

        let parent = dir.path().join("sub");
        let entries = runtime.read_dir(&parent).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with("nested"));

        runtime.remove_dir(&sub_dir).unwrap();
        assert!(!runtime.exists(&sub_dir));
    }

    #[test]
    fn test_temp_dirs_are_unique_and_removed_on_drop() {
        let runtime = RealRuntime;
        let parent = tempdir().unwrap();

        let a = runtime.temp_dir_in(parent.path(), ".staging-").unwrap();
        let b = runtime.temp_dir_in(parent.path(), ".staging-").unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(a.path().parent(), Some(parent.path()));
        assert!(
            a.path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(".staging-")
        );

        let path = a.path().to_path_buf();
        drop(a);
        assert!(!path.exists());
        assert!(b.path().is_dir());

        let scratch = runtime.temp_dir("bbpackage-").unwrap();
        assert!(scratch.path().is_dir());
    }

    #[test]
    fn test_temp_dir_in_missing_parent() {
        let parent = tempdir().unwrap();
        let missing = parent.path().join("missing");

        assert!(RealRuntime.temp_dir_in(&missing, "x-").is_err());
    }

    #[test]
    fn test_rename_noreplace_moves_directory() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let from = dir.path().join("a.bbpackage");
        let to = dir.path().join("b.bbpackage");
        std::fs::create_dir(&from).unwrap();
        std::fs::write(from.join("file"), "x").unwrap();

        runtime.rename_noreplace(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(to.join("file")).unwrap(), "x");
    }

    #[test]
    fn test_rename_noreplace_refuses_existing_target() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let from = dir.path().join("new");
        let to = dir.path().join("old");
        std::fs::create_dir(&from).unwrap();
        std::fs::create_dir(&to).unwrap();
        std::fs::write(to.join("keep"), "original").unwrap();

        let err = runtime.rename_noreplace(&from, &to).unwrap_err();

        let io_err = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io_err.kind(), std::io::ErrorKind::AlreadyExists);
        assert!(from.exists());
        assert_eq!(std::fs::read_to_string(to.join("keep")).unwrap(), "original");
    }

    #[cfg(unix)]
    #[test]
    fn test_is_symlink_does_not_follow() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        let link = dir.path().join("link");
        std::fs::create_dir(&target).unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert!(runtime.is_symlink(&link));
        assert!(!runtime.is_symlink(&target));

        runtime.remove_symlink(&link).unwrap();
        assert!(!runtime.is_symlink(&link));
        assert!(target.exists());
    }

    #[test]
    fn test_real_runtime_errors() {
        let runtime = RealRuntime;
        let missing = std::path::Path::new("/nonexistent/path/file.txt");

        assert!(runtime.open(missing).is_err());
        assert!(runtime.remove_file(missing).is_err());
    }
}
