//! Registry client: the package index service answering search, package
//! info and registration requests.

mod client;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

pub use client::{DEFAULT_REGISTRY_URL, RegistryClient};

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageSummary {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Resolved metadata for a single package.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub download_url: String,
}

/// Successful outcomes of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationResult {
    Added,
    Exists,
}

impl fmt::Display for RegistrationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationResult::Added => write!(f, "added"),
            RegistrationResult::Exists => write!(f, "exists"),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    async fn search(&self, term: &str) -> Result<Vec<PackageSummary>>;

    /// `Ok(None)` means the registry does not know the package.
    async fn get_info(&self, name: &str) -> Result<Option<PackageInfo>>;

    async fn register(&self, name: &str, url: &str) -> Result<RegistrationResult>;
}
