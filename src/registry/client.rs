use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use crate::error::PackageError;
use crate::http::HttpClient;

use super::{PackageInfo, PackageSummary, Registry, RegistrationResult};

pub const DEFAULT_REGISTRY_URL: &str = "http://bbpackages.org:3000";

/// HTTP implementation of [`Registry`] against `<base_url>/api/...`.
pub struct RegistryClient {
    http_client: HttpClient,
    base_url: String,
}

/// The search endpoint answers with a bare list; older deployments wrap it.
#[derive(Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    List(Vec<PackageSummary>),
    Wrapped { results: Vec<PackageSummary> },
}

#[derive(Deserialize)]
struct RegisterResponse {
    status: String,
}

impl RegistryClient {
    #[tracing::instrument(skip(http_client))]
    pub fn new(http_client: HttpClient, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            http_client,
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/api/{}", self.base_url, name)
    }
}

#[async_trait]
impl Registry for RegistryClient {
    #[tracing::instrument(skip(self))]
    async fn search(&self, term: &str) -> Result<Vec<PackageSummary>> {
        let response: SearchResponse = self
            .http_client
            .get_json_with_query(&self.endpoint("search"), &[("query", term)])
            .await?;

        let results = match response {
            SearchResponse::List(results) => results,
            SearchResponse::Wrapped { results } => results,
        };
        debug!("Search for '{}' returned {} result(s)", term, results.len());
        Ok(results)
    }

    #[tracing::instrument(skip(self))]
    async fn get_info(&self, name: &str) -> Result<Option<PackageInfo>> {
        self.http_client
            .get_optional_json(&self.endpoint("package_info"), &[("name", name)])
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn register(&self, name: &str, url: &str) -> Result<RegistrationResult> {
        let response: RegisterResponse = self
            .http_client
            .post_form(&self.endpoint("register"), &[("name", name), ("url", url)])
            .await
            .map_err(|e| PackageError::registry(format!("Registration failed: {:#}", e)))?;

        match response.status.as_str() {
            "added" => Ok(RegistrationResult::Added),
            "exists" => Ok(RegistrationResult::Exists),
            other => Err(PackageError::registry(format!(
                "Registration failed: unexpected status '{}'",
                other
            ))
            .into()),
        }
    }
}
