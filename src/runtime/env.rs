//! User identity and platform directories.

use std::path::PathBuf;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn user_home_dir_impl(&self) -> Option<PathBuf> {
        #[cfg(unix)]
        {
            use nix::unistd::{User, getuid};
            if let Ok(Some(user)) = User::from_uid(getuid()) {
                log::debug!("Resolved user {} with home {:?}", user.name, user.dir);
                return Some(user.dir);
            }
        }
        dirs::home_dir()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn data_dir_impl(&self) -> Option<PathBuf> {
        dirs::data_dir()
    }
}
