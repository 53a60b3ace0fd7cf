//! Runtime abstraction for system operations.
//!
//! Every component reaches the filesystem, the environment and child
//! processes through the [`Runtime`] trait, so tests can swap in a mock.
//!
//! # Structure
//!
//! - `env` - User identity and platform directories
//! - `fs` - File system operations (read, write, rename, remove, temp dirs)
//! - `process` - External command execution

mod env;
mod fs;
mod process;

use anyhow::Result;
use async_trait::async_trait;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A readable, seekable file handle. Zip archives need both.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Runtime: Send + Sync {
    // Environment
    /// Home directory of the user the process runs as, looked up by uid.
    fn user_home_dir(&self) -> Option<PathBuf>;

    /// Platform data directory (`~/.local/share` on Linux).
    fn data_dir(&self) -> Option<PathBuf>;

    // File System
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// True for symlinks, without following them.
    fn is_symlink(&self, path: &Path) -> bool;

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>>;
    fn open(&self, path: &Path) -> Result<Box<dyn ReadSeek>>;
    fn copy(&self, from: &Path, to: &Path) -> Result<u64>;

    /// Rename `from` to `to`, failing with `io::ErrorKind::AlreadyExists`
    /// if `to` is already present. Atomic on Linux/glibc.
    fn rename_noreplace(&self, from: &Path, to: &Path) -> Result<()>;

    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir(&self, path: &Path) -> Result<()>;
    fn remove_symlink(&self, path: &Path) -> Result<()>;

    /// Set file permissions (mode) on Unix systems. No-op on Windows.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()>;

    /// Create a uniquely named directory under the system temp dir. It is
    /// deleted when the returned guard is dropped.
    fn temp_dir(&self, prefix: &str) -> Result<TempDir>;

    /// Like [`Runtime::temp_dir`], but inside `parent`.
    fn temp_dir_in(&self, parent: &Path, prefix: &str) -> Result<TempDir>;

    // Processes
    /// Run `program` with `args` inside `cwd` and wait for it.
    /// Returns whether it exited successfully.
    async fn run_command(&self, program: &str, args: &[String], cwd: &Path) -> Result<bool>;
}

pub struct RealRuntime;

#[async_trait]
impl Runtime for RealRuntime {
    fn user_home_dir(&self) -> Option<PathBuf> {
        self.user_home_dir_impl()
    }

    fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir_impl()
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.is_dir_impl(path)
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.is_symlink_impl(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn create_file(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>> {
        self.create_file_impl(path)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ReadSeek>> {
        self.open_impl(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        self.copy_impl(from, to)
    }

    fn rename_noreplace(&self, from: &Path, to: &Path) -> Result<()> {
        self.rename_noreplace_impl(from, to)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.remove_file_impl(path)
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        self.remove_dir_impl(path)
    }

    fn remove_symlink(&self, path: &Path) -> Result<()> {
        self.remove_symlink_impl(path)
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> Result<()> {
        self.set_permissions_impl(path, mode)
    }

    fn temp_dir(&self, prefix: &str) -> Result<TempDir> {
        self.temp_dir_impl(prefix)
    }

    fn temp_dir_in(&self, parent: &Path, prefix: &str) -> Result<TempDir> {
        self.temp_dir_in_impl(parent, prefix)
    }

    async fn run_command(&self, program: &str, args: &[String], cwd: &Path) -> Result<bool> {
        self.run_command_impl(program, args, cwd).await
    }
}
