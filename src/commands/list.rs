use anyhow::Result;
use log::debug;

use crate::package::PackageRepository;
use crate::registry::Registry;
use crate::runtime::Runtime;

use super::config::Config;

/// List installed packages
#[tracing::instrument(skip(config))]
pub fn list<R: Runtime, G: Registry>(config: &Config<R, G>) -> Result<()> {
    debug!("Listing packages from {:?}", config.install_root);

    let repo = PackageRepository::new(&config.runtime, &config.install_root);
    let packages = repo.list()?;
    if packages.is_empty() {
        println!("No packages installed.");
        return Ok(());
    }

    for package in packages {
        println!("{}", package.dir_name());
    }
    Ok(())
}
