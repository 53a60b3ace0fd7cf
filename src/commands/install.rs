use anyhow::Result;
use log::debug;

use crate::install::{DependencyOutcome, InstallPipeline, InstallReport, Installer};
use crate::name::PackageName;
use crate::registry::Registry;
use crate::runtime::Runtime;

use super::config::Config;

/// Download a package from the registry and install it
#[tracing::instrument(skip(config))]
pub async fn install<R: Runtime, G: Registry>(name: &str, config: &Config<R, G>) -> Result<()> {
    let name: PackageName = name.parse()?;
    debug!("Using install root: {:?}", config.install_root);

    let installer = Installer::new(
        &config.runtime,
        &config.install_root,
        config.dependency_step.clone(),
    );
    let mut pipeline = InstallPipeline::new(
        &config.runtime,
        &config.registry,
        &config.transport,
        installer,
    );

    let report = pipeline.run(&name).await?;
    println!("{}", install_message(&report));
    Ok(())
}

pub(crate) fn install_message(report: &InstallReport) -> String {
    let mut lines = vec![format!(
        "Installed {} to {}",
        report.package.dir_name(),
        report.package.path.display()
    )];

    match &report.dependencies {
        DependencyOutcome::NotNeeded | DependencyOutcome::Installed => {}
        DependencyOutcome::Skipped => lines.push(format!(
            "Note: dependencies were not installed; run `npm install` in {}",
            report.package.path.join("Contents").display()
        )),
        DependencyOutcome::Failed(reason) => {
            lines.push(format!("Warning: dependency installation failed: {}", reason))
        }
    }

    lines.push("Restart BBEdit to load the package.".to_string());
    lines.join("\n")
}
