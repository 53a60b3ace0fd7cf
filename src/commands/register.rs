use anyhow::Result;
use log::debug;
use reqwest::Url;

use crate::error::PackageError;
use crate::name::PackageName;
use crate::registry::{Registry, RegistrationResult};
use crate::runtime::Runtime;

use super::config::Config;

/// Register a package name and its download URL with the registry
#[tracing::instrument(skip(config))]
pub async fn register<R: Runtime, G: Registry>(
    name: &str,
    url: &str,
    config: &Config<R, G>,
) -> Result<()> {
    let name: PackageName = name.parse()?;
    let url = parse_download_url(url)?;
    debug!("Registering {} -> {}", name, url);

    let result = config.registry.register(name.as_str(), url.as_str()).await?;
    println!("{}", register_message(&name, result));
    Ok(())
}

/// Only absolute http(s) URLs are accepted.
fn parse_download_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| PackageError::registry(format!("Invalid URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(PackageError::registry(format!(
            "Invalid URL '{}': unsupported scheme '{}'",
            raw, scheme
        ))
        .into()),
    }
}

fn register_message(name: &PackageName, result: RegistrationResult) -> String {
    match result {
        RegistrationResult::Added => format!("Package {} registered.", name),
        RegistrationResult::Exists => format!("Package {} is already registered.", name),
    }
}
