//! One entry point per CLI command. Each takes the shared [`Config`] and
//! prints its outcome on stdout.

pub mod config;
mod install;
mod list;
mod paths;
mod register;
mod search;
mod uninstall;

pub use config::{Config, Options};
pub use install::install;
pub use list::list;
pub use paths::default_install_root;
pub use register::register;
pub use search::search;
pub use uninstall::uninstall;
