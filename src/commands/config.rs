use anyhow::Result;
use log::{debug, warn};
use reqwest::Client;
use reqwest::redirect::Policy;

use std::path::PathBuf;

use crate::{
    download::Transport,
    http::{DEFAULT_MAX_REDIRECTS, HttpClient},
    install::DependencyStep,
    registry::{Registry, RegistryClient},
    runtime::Runtime,
};

use super::paths::default_install_root;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("bbpackage/", env!("BBPACKAGE_VERSION"));

/// Settings gathered from the command line and environment.
#[derive(Debug, Clone)]
pub struct Options {
    pub install_root: Option<PathBuf>,
    pub registry_url: Option<String>,
    pub max_redirects: usize,
    /// Accept invalid TLS certificates on downloads.
    pub insecure: bool,
    pub skip_dependencies: bool,
    pub dependency_program: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            install_root: None,
            registry_url: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            insecure: false,
            skip_dependencies: false,
            dependency_program: "npm".to_string(),
        }
    }
}

/// Everything one invocation needs, built once at startup.
pub struct Config<R: Runtime, G: Registry> {
    pub runtime: R,
    pub registry: G,
    pub transport: Transport,
    pub install_root: PathBuf,
    pub dependency_step: Option<DependencyStep>,
}

impl<R: Runtime> Config<R, RegistryClient> {
    pub fn new(runtime: R, options: Options) -> Result<Self> {
        let install_root = match options.install_root {
            Some(path) => path,
            None => default_install_root(&runtime)?,
        };
        debug!("Using install root: {:?}", install_root);

        let api_client = Client::builder().user_agent(USER_AGENT).build()?;

        if options.insecure {
            warn!("TLS certificate validation is disabled for downloads");
        }
        let download_client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(options.insecure)
            .build()?;

        let registry = RegistryClient::new(HttpClient::new(api_client), options.registry_url);
        let transport = Transport::new(HttpClient::new(download_client), options.max_redirects);
        let dependency_step =
            (!options.skip_dependencies).then(|| DependencyStep::npm(options.dependency_program));

        Ok(Self {
            runtime,
            registry,
            transport,
            install_root,
            dependency_step,
        })
    }
}

/// Config around a caller-supplied registry, for command tests.
#[cfg(test)]
pub(crate) fn test_config<R: Runtime, G: Registry>(
    runtime: R,
    registry: G,
    install_root: PathBuf,
) -> Config<R, G> {
    let client = Client::builder()
        .redirect(Policy::none())
        .build()
        .expect("test client");
    Config {
        runtime,
        registry,
        transport: Transport::new(HttpClient::new(client), DEFAULT_MAX_REDIRECTS),
        install_root,
        dependency_step: None,
    }
}
