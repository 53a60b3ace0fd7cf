pub mod archive;
pub mod commands;
pub mod download;
pub mod error;
pub mod http;
pub mod install;
pub mod name;
pub mod package;
pub mod registry;
pub mod runtime;
pub mod uninstall;

pub use error::PackageError;
