use anyhow::{Context, Result};
use log::{debug, warn};
use std::fmt;
use std::path::Path;
use tempfile::TempDir;

use crate::archive::resolve_bundle;
use crate::download::Transport;
use crate::error::PackageError;
use crate::name::PackageName;
use crate::registry::Registry;
use crate::runtime::Runtime;

use super::{InstallReport, Installer};

/// Where an install currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Resolving,
    Downloading,
    Extracting,
    Installing,
    Done,
    Failed(String),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Pending => write!(f, "pending"),
            Stage::Resolving => write!(f, "resolving"),
            Stage::Downloading => write!(f, "downloading"),
            Stage::Extracting => write!(f, "extracting"),
            Stage::Installing => write!(f, "installing"),
            Stage::Done => write!(f, "done"),
            Stage::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Prefix of the per-install working directory.
const WORK_DIR_PREFIX: &str = "bbpackage-";

/// Scratch space of one install: the downloaded archive and its extraction.
///
/// Everything lives in a uniquely named temporary directory that is deleted
/// when the artifact is dropped.
pub struct DownloadArtifact {
    dir: TempDir,
}

impl DownloadArtifact {
    pub fn new<R: Runtime>(runtime: &R) -> Result<Self> {
        let dir = runtime
            .temp_dir(WORK_DIR_PREFIX)
            .context("Failed to create temporary download directory")
            .map_err(|e| PackageError::filesystem(&e))?;
        debug!("Working directory {:?}", dir.path());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Registry lookup, download, extraction and installation, run strictly in
/// that order.
pub struct InstallPipeline<'a, R: Runtime, G: Registry> {
    runtime: &'a R,
    registry: &'a G,
    transport: &'a Transport,
    installer: Installer<'a, R>,
    stage: Stage,
}

impl<'a, R: Runtime, G: Registry> InstallPipeline<'a, R, G> {
    pub fn new(
        runtime: &'a R,
        registry: &'a G,
        transport: &'a Transport,
        installer: Installer<'a, R>,
    ) -> Self {
        Self {
            runtime,
            registry,
            transport,
            installer,
            stage: Stage::Pending,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Installs `name`. On failure the stage records which step broke.
    #[tracing::instrument(skip(self))]
    pub async fn run(&mut self, name: &PackageName) -> Result<InstallReport> {
        let result = self.run_stages(name).await;
        match &result {
            Ok(_) => self.enter(Stage::Done),
            Err(e) => {
                let failed_in = self.stage.to_string();
                self.enter(Stage::Failed(format!("{} ({})", e, failed_in)));
            }
        }
        result
    }

    async fn run_stages(&mut self, name: &PackageName) -> Result<InstallReport> {
        self.enter(Stage::Resolving);
        let info = self.registry.get_info(name.as_str()).await?.ok_or_else(|| {
            PackageError::registry(format!("Package '{}' not found in registry", name))
        })?;

        let artifact = DownloadArtifact::new(self.runtime)?;

        self.enter(Stage::Downloading);
        let archive = self
            .transport
            .fetch(self.runtime, &info.download_url, artifact.path())
            .await?;

        self.enter(Stage::Extracting);
        let bundle = resolve_bundle(self.runtime, &archive, artifact.path())?;

        if let Some(bundle_name) = bundle.file_name().and_then(|n| n.to_str())
            && PackageName::from_bundle_dir_name(bundle_name).ok().as_ref() != Some(name)
        {
            warn!(
                "Archive for '{}' contains bundle '{}', installing it under that name",
                name, bundle_name
            );
        }

        self.enter(Stage::Installing);
        self.installer.install(&bundle).await
    }

    fn enter(&mut self, stage: Stage) {
        debug!("Install stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }
}
