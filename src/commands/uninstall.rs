use anyhow::Result;
use log::debug;

use crate::registry::Registry;
use crate::runtime::Runtime;
use crate::uninstall::Uninstaller;

use super::config::Config;

/// Remove an installed package
#[tracing::instrument(skip(config))]
pub fn uninstall<R: Runtime, G: Registry>(name: &str, config: &Config<R, G>) -> Result<()> {
    debug!("Using install root: {:?}", config.install_root);
    let uninstaller = Uninstaller::new(&config.runtime, &config.install_root);
    let removed = uninstaller.uninstall(name)?;
    println!("Removed {}", removed.dir_name());
    Ok(())
}
